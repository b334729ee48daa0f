use crate::integrations::{ClientAuth, OAuthConfig, TokenBody};

pub const BASE_URL: &str = "https://api.airtable.com";
pub const AUTH_URL: &str = "https://airtable.com/oauth2/v1/authorize";
pub const TOKEN_URL: &str = "https://airtable.com/oauth2/v1/token";
pub const TOKEN_PATH: &str = "/oauth2/v1/token";
pub const SCOPES: &[&str] = &[
    "data.records:read",
    "data.recordComments:read",
    "schema.bases:read",
];

/// Airtable OAuth configuration: PKCE plus HTTP Basic client auth.
pub fn oauth_config(token_url: &str) -> OAuthConfig {
    OAuthConfig {
        auth_url: AUTH_URL.to_string(),
        token_url: token_url.to_string(),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        client_auth: ClientAuth::Basic,
        token_body: TokenBody::Form,
        pkce: true,
        extra_auth_params: Vec::new(),
    }
}
