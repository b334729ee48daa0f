use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::{NOTION_VERSION, PAGE_SIZE};
use crate::integrations::http::send_json;
use crate::integrations::ConnectorError;
use crmhub_model::Provider;

/// One rich-text segment. Only the rendered text is kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// Where a page or database lives. Workspace-level items have none of the ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parent {
    pub page_id: Option<String>,
    pub database_id: Option<String>,
    pub block_id: Option<String>,
}

/// A page or database returned by search.
#[derive(Debug, Deserialize)]
pub struct SearchResult {
    /// `page` or `database`
    pub object: String,
    pub id: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub parent: Parent,
    /// Page properties; one of them has `"type": "title"`
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Database title
    #[serde(default)]
    pub title: Vec<RichText>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

/// HTTP client for the Notion API. Authenticates with a Bearer token.
pub struct NotionClient<'a> {
    access_token: &'a str,
    http_client: &'a Client,
    base_url: &'a str,
}

impl<'a> NotionClient<'a> {
    pub fn new(access_token: &'a str, http_client: &'a Client, base_url: &'a str) -> Self {
        Self {
            access_token,
            http_client,
            base_url,
        }
    }

    /// Every page and database shared with the integration, in search order.
    pub async fn search_all(&self) -> Result<Vec<SearchResult>, ConnectorError> {
        let url = format!("{}/v1/search", self.base_url);
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = SearchRequest {
                page_size: PAGE_SIZE,
                start_cursor: cursor.as_deref(),
            };
            let request = self
                .http_client
                .post(&url)
                .bearer_auth(self.access_token)
                .header("Notion-Version", NOTION_VERSION)
                .json(&body);

            let page: SearchPage = send_json(Provider::Notion, request, "search").await?;
            results.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(results)
    }
}
