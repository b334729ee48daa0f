//! Record Viewer state machine.
//!
//! Holds what the viewer currently shows for one provider/credentials pair.
//! The front-end owns the I/O: it asks for a [`LoadRequest`], performs the
//! HTTP call, and feeds whatever comes back into
//! [`RecordViewer::apply_response`]. Responses are applied in the order they
//! resolve, so with two loads in flight the later arrival wins.
//!
//! ```text
//!  empty ──load──▶ loaded ──load──▶ loaded
//!    ▲                │
//!    └─────clear──────┘
//! ```

use crate::provider::Provider;
use crate::record::RecordKind;
use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;
use std::fmt;

/// Column headers. Every row has exactly one cell per column regardless of
/// its record type.
pub const COLUMNS: [&str; 8] = [
    "ID",
    "Type",
    "Name",
    "Email",
    "Domain",
    "Amount",
    "Created",
    "Last Modified",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One table row, cells aligned with [`COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub cells: [String; 8],
}

impl RecordRow {
    pub fn id(&self) -> &str {
        &self.cells[0]
    }
    pub fn record_type(&self) -> &str {
        &self.cells[1]
    }
    pub fn name(&self) -> &str {
        &self.cells[2]
    }
    pub fn email(&self) -> &str {
        &self.cells[3]
    }
    pub fn domain(&self) -> &str {
        &self.cells[4]
    }
    pub fn amount(&self) -> &str {
        &self.cells[5]
    }
}

/// What the viewer is showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayedData {
    #[default]
    Empty,
    /// The response was a JSON array
    Table(Vec<RecordRow>),
    /// Anything else, pretty-printed when it parses as JSON
    Raw(String),
}

/// A message the front-end must show in a blocking alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the alert for a non-2xx response, preferring the `detail` field.
    pub fn from_error_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("detail").cloned());

        let message = match detail {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => format!("Request failed with status {}", status),
            Some(other) => other.to_string(),
        };
        Self { message }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Everything the front-end needs to issue one load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// e.g. `/integrations/hubspot/load`
    pub path: String,
    /// Value for the `credentials` form field
    pub credentials: String,
}

/// Viewer state for a single provider selection.
#[derive(Debug, Clone)]
pub struct RecordViewer {
    provider: Provider,
    credentials: Option<String>,
    displayed: DisplayedData,
}

impl RecordViewer {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            credentials: None,
            displayed: DisplayedData::Empty,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Switch provider. Credentials and data belong to the old provider and
    /// are dropped.
    pub fn select_provider(&mut self, provider: Provider) {
        if provider != self.provider {
            self.provider = provider;
            self.credentials = None;
            self.displayed = DisplayedData::Empty;
        }
    }

    pub fn set_credentials(&mut self, credentials: impl Into<String>) {
        self.credentials = Some(credentials.into());
    }

    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.credentials.is_some()
    }

    /// The request for a Load action, or `None` before credentials are known.
    pub fn load_request(&self) -> Option<LoadRequest> {
        self.credentials.as_ref().map(|credentials| LoadRequest {
            path: self.provider.load_path(),
            credentials: credentials.clone(),
        })
    }

    /// Apply a load response. A 2xx body replaces whatever is displayed; any
    /// other status leaves the display untouched and returns the alert.
    pub fn apply_response(&mut self, status: u16, body: &str) -> Result<(), Alert> {
        if !(200..300).contains(&status) {
            return Err(Alert::from_error_response(status, body));
        }
        self.displayed = render_response(body);
        Ok(())
    }

    /// Local only: no request is made.
    pub fn clear(&mut self) {
        self.displayed = DisplayedData::Empty;
    }

    pub fn displayed(&self) -> &DisplayedData {
        &self.displayed
    }

    pub fn is_empty(&self) -> bool {
        self.displayed == DisplayedData::Empty
    }
}

/// Turn a successful response body into displayable data.
pub fn render_response(body: &str) -> DisplayedData {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => DisplayedData::Table(items.iter().map(record_row).collect()),
        Ok(other) => DisplayedData::Raw(
            serde_json::to_string_pretty(&other).unwrap_or_else(|_| body.to_string()),
        ),
        Err(_) => DisplayedData::Raw(body.to_string()),
    }
}

/// Build a row from one array element, timestamps in local time.
pub fn record_row(value: &Value) -> RecordRow {
    record_row_in(value, &Local)
}

/// Build a row from one array element, timestamps rendered in `tz`.
///
/// Only the cell matching the record's type among Email, Domain and Amount
/// is filled; the other two stay empty.
pub fn record_row_in<Tz: TimeZone>(value: &Value, tz: &Tz) -> RecordRow
where
    Tz::Offset: fmt::Display,
{
    let Some(obj) = value.as_object() else {
        let mut cells: [String; 8] = Default::default();
        cells[2] = value.to_string();
        return RecordRow { cells };
    };

    let record_type = cell_text(obj.get("type"));
    let kind = RecordKind::from_type(&record_type);
    let typed = |owner: RecordKind, field: &str| {
        if kind == owner {
            cell_text(obj.get(field))
        } else {
            String::new()
        }
    };

    RecordRow {
        cells: [
            cell_text(obj.get("id")),
            record_type.clone(),
            cell_text(obj.get("name")),
            typed(RecordKind::Contact, "email"),
            typed(RecordKind::Company, "domain"),
            typed(RecordKind::Deal, "amount"),
            timestamp_cell(obj.get("creation_time"), tz),
            timestamp_cell(obj.get("last_modified_time"), tz),
        ],
    }
}

/// Render an RFC 3339 timestamp in `tz`. Unparsable input is shown as-is.
pub fn format_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

fn timestamp_cell<Tz: TimeZone>(value: Option<&Value>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    match value {
        Some(Value::String(s)) if !s.is_empty() => format_timestamp(s, tz),
        _ => String::new(),
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
