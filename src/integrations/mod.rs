//! Integration adapters: one [`Connector`] per provider.
//!
//! Each adapter takes a provider-issued token blob, calls the provider's REST
//! API, and maps what comes back into [`NormalizedRecord`]s.
//!
//! ```text
//!   Credentials (token blob)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │  Connector::fetch                        │
//! │   api.rs         → provider REST calls   │
//! │   transformer.rs → NormalizedRecord      │
//! └─────────────────────────────────────────┘
//!          ↓
//!   Vec<NormalizedRecord> (provider order)
//! ```
//!
//! Any failure fails the whole load; there are no partial results.

mod connector;
mod error;
mod http;
pub mod airtable;
pub mod hubspot;
pub mod notion;
pub mod registry;

pub use connector::{ClientAuth, Connector, OAuthConfig, TokenBody};
pub use error::ConnectorError;
pub use registry::ConnectorRegistry;

use crate::credentials::Credentials;
use chrono::{DateTime, NaiveDateTime, Utc};
use crmhub_model::NormalizedRecord;
use tracing::{debug, info, warn};

/// Load the normalized record list for one token blob.
///
/// Blobs that say they are expired are rejected before any outbound call.
pub async fn load_records(
    connector: &dyn Connector,
    credentials: &Credentials,
) -> Result<Vec<NormalizedRecord>, ConnectorError> {
    let provider = connector.provider();

    if credentials.is_expired() {
        warn!(provider = %provider, "Rejecting expired access token");
        return Err(ConnectorError::Auth(format!(
            "{} access token has expired. Please reauthorize the integration.",
            provider.display_name()
        )));
    }

    debug!(provider = %provider, "Fetching records");
    let records = connector.fetch(credentials).await.map_err(|e| {
        warn!(provider = %provider, error = %e, "Record fetch failed");
        e
    })?;

    info!(provider = %provider, records = records.len(), "Records loaded");
    Ok(records)
}

/// Parse a provider timestamp as UTC.
///
/// Accepts RFC 3339 and the zone-less `YYYY-MM-DDTHH:MM:SS[.fff][Z]` forms;
/// anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}
