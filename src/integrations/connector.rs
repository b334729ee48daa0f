use super::ConnectorError;
use crate::credentials::Credentials;
use async_trait::async_trait;
use crmhub_model::{NormalizedRecord, Provider};

/// Adapter interface for one provider.
///
/// Connectors are stateless: the token blob arrives with every call and
/// nothing is cached between calls.
///
/// # Lifecycle
/// 1. The OAuth endpoints use `oauth_config()` to send the user to the
///    provider and to exchange/refresh tokens
/// 2. The client keeps the resulting token blob
/// 3. `POST /integrations/{provider}/load` calls `fetch(credentials)`
/// 4. Records go back to the client in provider order
#[async_trait]
pub trait Connector: Send + Sync {
    /// Which provider this connector talks to.
    fn provider(&self) -> Provider;

    /// OAuth endpoints, scopes and token-endpoint conventions.
    fn oauth_config(&self) -> OAuthConfig;

    /// Fetch every record visible to the token and normalize it.
    ///
    /// # Error Handling
    /// - 401/403 from the provider → [`ConnectorError::Auth`]
    /// - 429 → [`ConnectorError::RateLimited`]
    /// - anything else unexpected → [`ConnectorError::Upstream`]
    ///
    /// The first failure aborts the fetch; records gathered so far are
    /// discarded.
    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<NormalizedRecord>, ConnectorError>;
}

/// How the client id/secret are presented to the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientAuth {
    /// `client_id` and `client_secret` in the request body
    RequestBody,
    /// HTTP Basic `client_id:client_secret`
    Basic,
}

/// Encoding of the token endpoint request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenBody {
    Form,
    Json,
}

/// OAuth configuration for a connector.
#[derive(Clone, Debug)]
pub struct OAuthConfig {
    /// OAuth authorization endpoint URL
    pub auth_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// Required OAuth scopes (empty when the provider takes none)
    pub scopes: Vec<String>,

    pub client_auth: ClientAuth,

    pub token_body: TokenBody,

    /// Whether the provider requires PKCE (S256)
    pub pkce: bool,

    /// Extra query parameters for the authorization URL
    pub extra_auth_params: Vec<(String, String)>,
}
