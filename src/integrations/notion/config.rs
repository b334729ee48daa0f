use crate::integrations::{ClientAuth, OAuthConfig, TokenBody};

pub const BASE_URL: &str = "https://api.notion.com";
pub const AUTH_PATH: &str = "/v1/oauth/authorize";
pub const TOKEN_PATH: &str = "/v1/oauth/token";

/// Pinned API version sent as `Notion-Version` on every call.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Results per search page (the API maximum).
pub const PAGE_SIZE: u32 = 100;

/// Notion OAuth configuration. Notion has no scopes; access is whatever the
/// user shares during consent.
pub fn oauth_config(base_url: &str) -> OAuthConfig {
    OAuthConfig {
        auth_url: format!("{}{}", base_url, AUTH_PATH),
        token_url: format!("{}{}", base_url, TOKEN_PATH),
        scopes: Vec::new(),
        client_auth: ClientAuth::Basic,
        token_body: TokenBody::Json,
        pkce: false,
        extra_auth_params: vec![("owner".to_string(), "user".to_string())],
    }
}
