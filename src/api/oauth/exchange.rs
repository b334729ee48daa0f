//! OAuth token endpoint calls: code exchange and refresh.
//!
//! Each provider's conventions (client auth style, body encoding) come from
//! its [`OAuthConfig`].

use crate::config::OAuthClient;
use crate::credentials::Credentials;
use crate::integrations::{ClientAuth, OAuthConfig, TokenBody};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde_json::{Map, Value};

/// Exchange an authorization code for a token blob
///
/// # Arguments
/// * `redirect_uri` - Must equal the one sent with the authorization request
/// * `code_verifier` - PKCE verifier, when the provider uses PKCE
///
/// # Returns
/// The provider's token response, stamped with `created_at`
pub async fn exchange_code_for_token(
    http: &Client,
    oauth: &OAuthConfig,
    client: &OAuthClient,
    code: &str,
    redirect_uri: &str,
    code_verifier: Option<&str>,
) -> Result<Credentials> {
    let mut params = vec![
        ("grant_type", "authorization_code".to_string()),
        ("code", code.to_string()),
        ("redirect_uri", redirect_uri.to_string()),
    ];
    if let Some(verifier) = code_verifier {
        params.push(("code_verifier", verifier.to_string()));
    }

    tracing::debug!(token_url = %oauth.token_url, "Exchanging authorization code for token");
    request_token(http, oauth, client, params).await
}

/// Refresh an access token.
///
/// Providers that do not rotate refresh tokens omit `refresh_token` from the
/// response; the previous one is kept in that case.
pub async fn refresh_access_token(
    http: &Client,
    oauth: &OAuthConfig,
    client: &OAuthClient,
    refresh_token: &str,
) -> Result<Credentials> {
    let params = vec![
        ("grant_type", "refresh_token".to_string()),
        ("refresh_token", refresh_token.to_string()),
    ];

    tracing::debug!(token_url = %oauth.token_url, "Refreshing access token");
    let mut credentials = request_token(http, oauth, client, params).await?;
    if credentials.refresh_token.is_none() {
        credentials.refresh_token = Some(refresh_token.to_string());
    }
    Ok(credentials)
}

async fn request_token(
    http: &Client,
    oauth: &OAuthConfig,
    client: &OAuthClient,
    mut params: Vec<(&str, String)>,
) -> Result<Credentials> {
    let mut request = http.post(&oauth.token_url).header("Accept", "application/json");

    match oauth.client_auth {
        ClientAuth::RequestBody => {
            params.push(("client_id", client.client_id.clone()));
            params.push(("client_secret", client.client_secret.clone()));
        }
        ClientAuth::Basic => {
            request = request.basic_auth(&client.client_id, Some(&client.client_secret));
        }
    }

    request = match oauth.token_body {
        TokenBody::Form => request.form(&params),
        TokenBody::Json => {
            let body: Map<String, Value> = params
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v)))
                .collect();
            request.json(&body)
        }
    };

    let response = request
        .send()
        .await
        .context("Failed to send token request")?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read token response")?;

    if !status.is_success() {
        return Err(anyhow!(
            "Token request failed with status {}: {}",
            status,
            body
        ));
    }

    let credentials =
        Credentials::parse(&body).map_err(|e| anyhow!("Invalid token response: {}", e))?;

    tracing::debug!(
        has_refresh_token = credentials.refresh_token.is_some(),
        expires_in = ?credentials.expires_in,
        "Token request successful"
    );

    Ok(credentials.stamped(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{airtable, hubspot, notion};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn app() -> OAuthClient {
        OAuthClient {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exchange_with_secret_in_form_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/v1/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
                Matcher::UrlEncoded("client_secret".into(), "csecret".into()),
                Matcher::UrlEncoded("redirect_uri".into(), "http://cb".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"hs-a","refresh_token":"hs-r","expires_in":1800,"token_type":"bearer"}"#)
            .create_async()
            .await;

        let oauth = hubspot::config::oauth_config(&server.url());
        let before = Utc::now().timestamp();
        let creds = exchange_code_for_token(&Client::new(), &oauth, &app(), "the-code", "http://cb", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(creds.access_token, "hs-a");
        assert_eq!(creds.extra["token_type"], "bearer");
        assert!(creds.created_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_exchange_with_basic_auth_and_pkce() {
        let mut server = Server::new_async().await;
        // base64("cid:csecret")
        let mock = server
            .mock("POST", "/oauth2/v1/token")
            .match_header("authorization", "Basic Y2lkOmNzZWNyZXQ=")
            .match_body(Matcher::UrlEncoded("code_verifier".into(), "verifier-123".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"at-a","refresh_token":"at-r","expires_in":3600}"#)
            .create_async()
            .await;

        let oauth = airtable::config::oauth_config(&format!("{}/oauth2/v1/token", server.url()));
        let creds = exchange_code_for_token(
            &Client::new(),
            &oauth,
            &app(),
            "c",
            "http://cb",
            Some("verifier-123"),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(creds.refresh_token.as_deref(), Some("at-r"));
    }

    #[tokio::test]
    async fn test_exchange_with_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/oauth/token")
            .match_header("authorization", "Basic Y2lkOmNzZWNyZXQ=")
            .match_body(Matcher::Json(json!({
                "grant_type": "authorization_code",
                "code": "c",
                "redirect_uri": "http://cb"
            })))
            .with_status(200)
            .with_body(r#"{"access_token":"secret_n","bot_id":"b1","workspace_name":"Acme"}"#)
            .create_async()
            .await;

        let oauth = notion::config::oauth_config(&server.url());
        let creds = exchange_code_for_token(&Client::new(), &oauth, &app(), "c", "http://cb", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(creds.extra["workspace_name"], "Acme");
    }

    #[tokio::test]
    async fn test_exchange_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body(r#"{"status":"BAD_AUTH_CODE","message":"missing or unknown auth code"}"#)
            .create_async()
            .await;

        let oauth = hubspot::config::oauth_config(&server.url());
        let err = exchange_code_for_token(&Client::new(), &oauth, &app(), "bad", "http://cb", None)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("BAD_AUTH_CODE"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old-r".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"new-a","expires_in":1800}"#)
            .create_async()
            .await;

        let oauth = hubspot::config::oauth_config(&server.url());
        let creds = refresh_access_token(&Client::new(), &oauth, &app(), "old-r")
            .await
            .unwrap();

        assert_eq!(creds.access_token, "new-a");
        assert_eq!(creds.refresh_token.as_deref(), Some("old-r"));
        assert!(!creds.is_expired());
    }
}
