pub mod api;
pub mod config;
pub mod transformer;

use crate::credentials::Credentials;
use crate::integrations::{Connector, ConnectorError, OAuthConfig};
use async_trait::async_trait;
use crmhub_model::{NormalizedRecord, Provider};
use reqwest::Client;

use self::api::NotionClient;
use self::config::BASE_URL;
use self::transformer::result_to_record;

/// Notion connector: every page and database shared with the integration.
pub struct NotionConnector {
    base_url: String,
    http_client: Client,
}

impl NotionConnector {
    /// Create a connector using the real Notion API base URL.
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    /// Create a connector with a custom API base URL (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            http_client: Client::new(),
        }
    }
}

impl Default for NotionConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for NotionConnector {
    fn provider(&self) -> Provider {
        Provider::Notion
    }

    fn oauth_config(&self) -> OAuthConfig {
        config::oauth_config(&self.base_url)
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<NormalizedRecord>, ConnectorError> {
        let client = NotionClient::new(&credentials.access_token, &self.http_client, &self.base_url);
        let results = client.search_all().await?;
        Ok(results.iter().map(result_to_record).collect())
    }
}
