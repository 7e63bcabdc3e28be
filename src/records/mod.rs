//! Repair-history records and their normalized document form.

mod document;
mod normalizer;
mod source;

pub use document::{Document, DocumentMetadata, ScoredDocument};
pub use normalizer::{duration_hours, normalize, ColumnMap, RepairRecord, MISSING_FIELD};
pub use source::{CsvRecordSource, DocumentSource};
