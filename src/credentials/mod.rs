//! OAuth token blobs and their encrypted storage.
//!
//! A provider's token response is kept verbatim (unknown fields included) so
//! the client gets back exactly what the provider issued, plus a `created_at`
//! stamp the server adds when the token is obtained or refreshed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - keyed by (provider, org, user)        │
//! │  - per-row TTL, expired rows never read  │
//! └─────────────────────────────────────────┘
//!          ↓ seal               ↑ open
//! ┌─────────────────────────────────────────┐
//! │       AES-256-GCM (encryption.rs)        │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite                             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use crmhub::credentials::{CredentialStore, Credentials};
//! use crmhub::Provider;
//! use chrono::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let key = crmhub::credentials::generate_key();
//! let store = CredentialStore::new(":memory:", &key)?;
//!
//! let creds = Credentials::parse(r#"{"access_token":"abc","expires_in":1800}"#)?;
//! store.store(Provider::HubSpot, "org1", "user1", &creds, Duration::hours(1))?;
//!
//! if let Some(found) = store.get(Provider::HubSpot, "org1", "user1")? {
//!     println!("token: {}", found.access_token);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

mod encryption;
mod storage;

pub use encryption::{generate_key, open, seal, validate_key};
pub use storage::CredentialStore;

/// An OAuth token blob as issued by a provider.
///
/// # Security
/// - Encrypted at rest in the credential store
/// - Never logged; only `has_refresh_token`-style facts are
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth access token (used for API requests)
    pub access_token: String,

    /// OAuth refresh token (Notion never issues one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Unix seconds at which the token was issued, stamped by this server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// Everything else the provider sent (token_type, scope, workspace_id...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// Parse the JSON string a client submits as its `credentials` field.
    pub fn parse(raw: &str) -> Result<Self, CredentialsFormatError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|_| CredentialsFormatError::Malformed)?;

        let Value::Object(map) = value else {
            return Err(CredentialsFormatError::Malformed);
        };

        match map.get("access_token") {
            Some(Value::String(token)) if !token.is_empty() => {}
            _ => return Err(CredentialsFormatError::MissingAccessToken),
        }

        serde_json::from_value(Value::Object(map)).map_err(|_| CredentialsFormatError::Malformed)
    }

    /// Stamp the issue time. Called whenever a token comes back from a
    /// provider's token endpoint.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.created_at = Some(now.timestamp());
        self
    }

    /// When the access token stops working, if the blob says.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created_at = self.created_at?;
        let expires_in = self.expires_in?;
        Utc.timestamp_opt(created_at.checked_add(expires_in)?, 0).single()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Why a submitted credentials string was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialsFormatError {
    /// Not a JSON object
    Malformed,
    /// No non-empty `access_token` string
    MissingAccessToken,
}

impl fmt::Display for CredentialsFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsFormatError::Malformed => write!(f, "Invalid credentials format"),
            CredentialsFormatError::MissingAccessToken => {
                write!(f, "Invalid credentials: missing access token")
            }
        }
    }
}

impl std::error::Error for CredentialsFormatError {}
