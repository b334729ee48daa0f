//! Authorization URL construction.

use crate::integrations::OAuthConfig;

/// Build the provider authorization URL.
///
/// `code_challenge` is the S256 PKCE challenge, for providers that use PKCE.
pub fn build_auth_url(
    oauth: &OAuthConfig,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    code_challenge: Option<&str>,
) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("client_id", client_id.to_string()),
        ("redirect_uri", redirect_uri.to_string()),
        ("response_type", "code".to_string()),
    ];
    if !oauth.scopes.is_empty() {
        params.push(("scope", oauth.scopes.join(" ")));
    }
    params.push(("state", state.to_string()));
    if let Some(challenge) = code_challenge {
        params.push(("code_challenge", challenge.to_string()));
        params.push(("code_challenge_method", "S256".to_string()));
    }
    for (key, value) in &oauth.extra_auth_params {
        params.push((key.as_str(), value.clone()));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", oauth.auth_url, query)
}
