pub mod api;
pub mod config;
pub mod transformer;

use crate::credentials::Credentials;
use crate::integrations::{Connector, ConnectorError, OAuthConfig};
use async_trait::async_trait;
use crmhub_model::{NormalizedRecord, Provider};
use reqwest::Client;

use self::api::{CrmObjectType, HubSpotClient};
use self::config::BASE_URL;
use self::transformer::object_to_record;

/// HubSpot connector: contacts, then companies, then deals.
pub struct HubSpotConnector {
    base_url: String,
    http_client: Client,
}

impl HubSpotConnector {
    /// Create a connector using the real HubSpot API base URL.
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

impl Default for HubSpotConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for HubSpotConnector {
    fn provider(&self) -> Provider {
        Provider::HubSpot
    }

    fn oauth_config(&self) -> OAuthConfig {
        config::oauth_config(&self.base_url)
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<NormalizedRecord>, ConnectorError> {
        let client = HubSpotClient::new(&credentials.access_token, &self.http_client, &self.base_url);
        let mut records = Vec::new();

        for object_type in CrmObjectType::ALL {
            let objects = client.fetch_objects(object_type).await?;
            tracing::debug!(
                collection = object_type.collection(),
                count = objects.len(),
                "Fetched HubSpot objects"
            );
            records.extend(objects.iter().map(|o| object_to_record(o, object_type)));
        }

        Ok(records)
    }
}
