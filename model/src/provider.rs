use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A third-party service crmhub can connect to.
///
/// The lowercase name is what appears in `/integrations/{provider}/...` paths
/// and in the `{PROVIDER}_CLIENT_ID` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    HubSpot,
    Airtable,
    Notion,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::HubSpot, Provider::Airtable, Provider::Notion];

    /// Path segment / storage key form (e.g. "hubspot").
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::HubSpot => "hubspot",
            Provider::Airtable => "airtable",
            Provider::Notion => "notion",
        }
    }

    /// Human-facing name used in error messages and the viewer.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::HubSpot => "HubSpot",
            Provider::Airtable => "Airtable",
            Provider::Notion => "Notion",
        }
    }

    /// Prefix of the client id/secret environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::HubSpot => "HUBSPOT",
            Provider::Airtable => "AIRTABLE",
            Provider::Notion => "NOTION",
        }
    }

    /// Relative path of the load endpoint for this provider.
    pub fn load_path(&self) -> String {
        format!("/integrations/{}/load", self.as_str())
    }

    /// The provider after this one, wrapping around. Used for cycling in the UI.
    pub fn next(&self) -> Provider {
        match self {
            Provider::HubSpot => Provider::Airtable,
            Provider::Airtable => Provider::Notion,
            Provider::Notion => Provider::HubSpot,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment does not name a supported provider.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integration '{}' not found", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hubspot" => Ok(Provider::HubSpot),
            "airtable" => Ok(Provider::Airtable),
            "notion" => Ok(Provider::Notion),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}
