use crmhub_model::NormalizedRecord;
use serde_json::Value;

use super::api::{RichText, SearchResult};
use crate::integrations::parse_timestamp;

const UNTITLED: &str = "Untitled";

/// Transform a search result into a normalized record.
///
/// The Notion id is kept as is; `type` is the result's `object`.
pub fn result_to_record(result: &SearchResult) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(result.id.clone(), result.object.clone(), title_of(result));
    record.creation_time = result.created_time.as_deref().and_then(parse_timestamp);
    record.last_modified_time = result.last_edited_time.as_deref().and_then(parse_timestamp);
    record.url = result.url.clone();
    record.parent_id = result
        .parent
        .page_id
        .clone()
        .or_else(|| result.parent.database_id.clone())
        .or_else(|| result.parent.block_id.clone());
    record
}

/// Database title, else the page's title property, else "Untitled".
fn title_of(result: &SearchResult) -> String {
    let from_database = join_plain_text(&result.title);
    if !from_database.is_empty() {
        return from_database;
    }

    let from_page = result
        .properties
        .values()
        .find(|prop| prop.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(|prop| prop.get("title"))
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|s| s.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    if from_page.is_empty() {
        UNTITLED.to_string()
    } else {
        from_page
    }
}

fn join_plain_text(segments: &[RichText]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}
