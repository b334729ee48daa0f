use crate::integrations::{ClientAuth, OAuthConfig, TokenBody};

pub const BASE_URL: &str = "https://api.hubapi.com";
pub const AUTH_URL: &str = "https://app.hubspot.com/oauth/authorize";
pub const TOKEN_PATH: &str = "/oauth/v1/token";
pub const SCOPES: &[&str] = &[
    "crm.objects.contacts.read",
    "crm.objects.companies.read",
    "crm.objects.deals.read",
];

/// Page size for every CRM object listing.
pub const PAGE_LIMIT: u32 = 100;

/// HubSpot OAuth configuration. The token endpoint lives on the API host.
pub fn oauth_config(base_url: &str) -> OAuthConfig {
    OAuthConfig {
        auth_url: AUTH_URL.to_string(),
        token_url: format!("{}{}", base_url, TOKEN_PATH),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        client_auth: ClientAuth::RequestBody,
        token_body: TokenBody::Form,
        pkce: false,
        extra_auth_params: Vec::new(),
    }
}
