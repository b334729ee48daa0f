use reqwest::Client;
use serde::Deserialize;

use crate::integrations::http::send_json;
use crate::integrations::ConnectorError;
use crmhub_model::Provider;

/// A base visible to the token.
#[derive(Debug, Deserialize)]
pub struct AirtableBase {
    pub id: String,
    pub name: String,
}

/// A table within a base. Fields and views are not read.
#[derive(Debug, Deserialize)]
pub struct AirtableTable {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct BasesPage {
    #[serde(default)]
    bases: Vec<AirtableBase>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablesResponse {
    #[serde(default)]
    tables: Vec<AirtableTable>,
}

/// HTTP client for the Airtable metadata API. Authenticates with a Bearer token.
pub struct AirtableClient<'a> {
    access_token: &'a str,
    http_client: &'a Client,
    base_url: &'a str,
}

impl<'a> AirtableClient<'a> {
    pub fn new(access_token: &'a str, http_client: &'a Client, base_url: &'a str) -> Self {
        Self {
            access_token,
            http_client,
            base_url,
        }
    }

    /// Fetch every base, following the `offset` cursor until it is absent.
    pub async fn fetch_bases(&self) -> Result<Vec<AirtableBase>, ConnectorError> {
        let url = format!("{}/v0/meta/bases", self.base_url);
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(self.access_token);
            if let Some(cursor) = &offset {
                request = request.query(&[("offset", cursor)]);
            }

            let page: BasesPage = send_json(Provider::Airtable, request, "bases").await?;
            bases.extend(page.bases);

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        Ok(bases)
    }

    /// Fetch the tables of one base.
    pub async fn fetch_tables(&self, base_id: &str) -> Result<Vec<AirtableTable>, ConnectorError> {
        let url = format!(
            "{}/v0/meta/bases/{}/tables",
            self.base_url,
            urlencoding::encode(base_id)
        );
        let request = self.http_client.get(&url).bearer_auth(self.access_token);

        let response: TablesResponse =
            send_json(Provider::Airtable, request, &format!("tables of base {}", base_id)).await?;
        Ok(response.tables)
    }
}
