pub mod api;
pub mod config;
pub mod transformer;

use crate::credentials::Credentials;
use crate::integrations::{Connector, ConnectorError, OAuthConfig};
use async_trait::async_trait;
use crmhub_model::{NormalizedRecord, Provider};
use reqwest::Client;

use self::api::AirtableClient;
use self::config::{BASE_URL, TOKEN_PATH, TOKEN_URL};
use self::transformer::{base_to_record, table_to_record};

/// Airtable connector: every base, each followed by its tables.
pub struct AirtableConnector {
    base_url: String,
    token_url: String,
    http_client: Client,
}

impl AirtableConnector {
    /// Create a connector using the real Airtable endpoints.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Create a connector with a custom base URL serving both the API and
    /// the token endpoint (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            token_url: format!("{}{}", base_url, TOKEN_PATH),
            base_url,
            http_client: Client::new(),
        }
    }
}

impl Default for AirtableConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for AirtableConnector {
    fn provider(&self) -> Provider {
        Provider::Airtable
    }

    fn oauth_config(&self) -> OAuthConfig {
        config::oauth_config(&self.token_url)
    }

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<NormalizedRecord>, ConnectorError> {
        let client = AirtableClient::new(&credentials.access_token, &self.http_client, &self.base_url);
        let bases = client.fetch_bases().await?;
        let mut records = Vec::with_capacity(bases.len());

        for base in &bases {
            records.push(base_to_record(base));
            // A base whose tables cannot be read fails the whole load
            let tables = client.fetch_tables(&base.id).await?;
            records.extend(tables.iter().map(|t| table_to_record(base, t)));
        }

        Ok(records)
    }
}
