use crmhub_model::NormalizedRecord;

use super::api::{CrmObject, CrmObjectType};
use crate::integrations::parse_timestamp;

/// Transform a HubSpot CRM object into a normalized record.
///
/// Record id: `{id}_{type}`. Only the field matching the type among
/// email/domain/amount is filled.
pub fn object_to_record(object: &CrmObject, object_type: CrmObjectType) -> NormalizedRecord {
    let id = &object.id;
    let email = object.property("email");
    let domain = object.property("domain");
    let amount = object.property("amount");

    let name = match object_type {
        CrmObjectType::Contact => {
            let full = format!(
                "{} {}",
                object.property("firstname").unwrap_or(""),
                object.property("lastname").unwrap_or("")
            );
            let full = full.trim();
            let name = if full.is_empty() {
                email.map(str::to_string).unwrap_or_else(|| format!("Contact {}", id))
            } else {
                full.to_string()
            };
            match email {
                Some(email) => format!("{} ({})", name, email),
                None => name,
            }
        }
        CrmObjectType::Company => {
            let name = object
                .property("name")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Company {}", id));
            match domain {
                Some(domain) => format!("{} ({})", name, domain),
                None => name,
            }
        }
        CrmObjectType::Deal => {
            let name = object
                .property("dealname")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Deal {}", id));
            match amount {
                Some(amount) => format!("{} (${})", name, amount),
                None => name,
            }
        }
    };

    let mut record = NormalizedRecord::new(
        format!("{}_{}", id, object_type.record_type()),
        object_type.record_type(),
        name,
    );
    record.creation_time = object.created_at.as_deref().and_then(parse_timestamp);
    record.last_modified_time = object.updated_at.as_deref().and_then(parse_timestamp);

    match object_type {
        CrmObjectType::Contact => {
            record.email = email.map(str::to_string);
            record.phone = object.property("phone").map(str::to_string);
        }
        CrmObjectType::Company => {
            record.domain = domain.map(str::to_string);
            record.phone = object.property("phone").map(str::to_string);
        }
        CrmObjectType::Deal => {
            record.amount = amount.map(str::to_string);
        }
    }

    record
}
