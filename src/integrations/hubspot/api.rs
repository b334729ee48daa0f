use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use super::config::PAGE_LIMIT;
use crate::integrations::http::send_json;
use crate::integrations::ConnectorError;
use crmhub_model::Provider;

/// The CRM object collections the adapter reads, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrmObjectType {
    Contact,
    Company,
    Deal,
}

impl CrmObjectType {
    pub const ALL: [CrmObjectType; 3] = [
        CrmObjectType::Contact,
        CrmObjectType::Company,
        CrmObjectType::Deal,
    ];

    /// Collection segment in `/crm/v3/objects/{segment}`.
    pub fn collection(&self) -> &'static str {
        match self {
            CrmObjectType::Contact => "contacts",
            CrmObjectType::Company => "companies",
            CrmObjectType::Deal => "deals",
        }
    }

    /// Record type of the normalized record.
    pub fn record_type(&self) -> &'static str {
        match self {
            CrmObjectType::Contact => "contact",
            CrmObjectType::Company => "company",
            CrmObjectType::Deal => "deal",
        }
    }
}

/// One CRM object. HubSpot sends every property value as a string or null.
#[derive(Debug, Deserialize)]
pub struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

impl CrmObject {
    /// A property value, with empty strings treated as absent.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CrmObjectPage {
    #[serde(default)]
    results: Vec<CrmObject>,
}

/// HTTP client for the HubSpot CRM v3 API. Authenticates with a Bearer token.
pub struct HubSpotClient<'a> {
    access_token: &'a str,
    http_client: &'a Client,
    base_url: &'a str,
}

impl<'a> HubSpotClient<'a> {
    pub fn new(access_token: &'a str, http_client: &'a Client, base_url: &'a str) -> Self {
        Self {
            access_token,
            http_client,
            base_url,
        }
    }

    /// Fetch the first page of one object collection.
    pub async fn fetch_objects(
        &self,
        object_type: CrmObjectType,
    ) -> Result<Vec<CrmObject>, ConnectorError> {
        let url = format!(
            "{}/crm/v3/objects/{}?limit={}",
            self.base_url,
            object_type.collection(),
            PAGE_LIMIT
        );
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(self.access_token)
            .header("Content-Type", "application/json");

        let page: CrmObjectPage =
            send_json(Provider::HubSpot, request, object_type.collection()).await?;
        Ok(page.results)
    }
}
