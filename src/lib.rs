// HTTP API: OAuth endpoints and record loading
pub mod api;

// TOML config and environment overrides
pub mod config;

// Token blobs and their encrypted store
pub mod credentials;

// Provider adapters
pub mod integrations;

pub use crmhub_model::{NormalizedRecord, Provider};
