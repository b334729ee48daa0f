use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The one cross-provider record shape.
///
/// `record_type` decides which of `email`, `domain` and `amount` carries
/// meaning: contacts have an email, companies a domain, deals an amount.
/// Adapters only ever fill the field matching the type, and the optional
/// fields are omitted from the JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Opaque provider-assigned identifier
    pub id: String,

    /// `contact`, `company`, `deal`, or a provider tag such as `page`
    #[serde(rename = "type")]
    pub record_type: String,

    /// Display label
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

impl NormalizedRecord {
    pub fn new(id: impl Into<String>, record_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            name: name.into(),
            email: None,
            domain: None,
            amount: None,
            phone: None,
            creation_time: None,
            last_modified_time: None,
            url: None,
            parent_id: None,
            parent_name: None,
        }
    }
}

/// The record types that own one of the type-specific columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Contact,
    Company,
    Deal,
    Other,
}

impl RecordKind {
    pub fn from_type(record_type: &str) -> Self {
        match record_type {
            "contact" => RecordKind::Contact,
            "company" => RecordKind::Company,
            "deal" => RecordKind::Deal,
            _ => RecordKind::Other,
        }
    }
}
