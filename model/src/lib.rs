//! Shared types for crmhub.
//!
//! Used by both the integration server and the browser viewer:
//!
//! - [`NormalizedRecord`] - the single record shape every provider maps into
//! - [`Provider`] - the three supported integrations
//! - [`viewer::RecordViewer`] - the Record Viewer state machine (no I/O)

pub mod provider;
pub mod record;
pub mod viewer;

pub use provider::{Provider, UnknownProvider};
pub use record::{NormalizedRecord, RecordKind};
pub use viewer::{Alert, DisplayedData, RecordRow, RecordViewer, COLUMNS};
