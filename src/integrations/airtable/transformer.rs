use crmhub_model::NormalizedRecord;

use super::api::{AirtableBase, AirtableTable};

/// Record id of a base: `{base_id}_base`.
pub fn base_record_id(base: &AirtableBase) -> String {
    format!("{}_base", base.id)
}

pub fn base_to_record(base: &AirtableBase) -> NormalizedRecord {
    NormalizedRecord::new(base_record_id(base), "base", base.name.clone())
}

/// A table record points back at its base through `parent_id`/`parent_name`.
pub fn table_to_record(base: &AirtableBase, table: &AirtableTable) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(format!("{}_table", table.id), "table", table.name.clone());
    record.parent_id = Some(base_record_id(base));
    record.parent_name = Some(base.name.clone());
    record
}
