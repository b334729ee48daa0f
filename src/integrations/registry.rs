//! Connector registry: one adapter per provider.

use super::airtable::AirtableConnector;
use super::hubspot::HubSpotConnector;
use super::notion::NotionConnector;
use super::Connector;
use crmhub_model::Provider;
use std::collections::HashMap;
use std::sync::Arc;

/// Returns the production connectors, one per provider.
pub fn get_all_connectors() -> Vec<Arc<dyn Connector>> {
    vec![
        Arc::new(HubSpotConnector::new()),
        Arc::new(AirtableConnector::new()),
        Arc::new(NotionConnector::new()),
    ]
}

/// Provider → connector lookup shared by the HTTP handlers.
#[derive(Clone)]
pub struct ConnectorRegistry {
    connectors: HashMap<Provider, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::from_connectors(get_all_connectors())
    }

    /// Build a registry from explicit connectors (tests point these at mock
    /// servers). A later connector for the same provider replaces an earlier one.
    pub fn from_connectors(connectors: Vec<Arc<dyn Connector>>) -> Self {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.provider(), c))
            .collect();
        Self { connectors }
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&provider).cloned()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
