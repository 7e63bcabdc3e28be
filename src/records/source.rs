use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use super::document::Document;
use super::normalizer::{normalize, ColumnMap, RepairRecord};
use crate::core::errors::RagError;

/// Supplies the full document set when the corpus index has to be built.
pub trait DocumentSource: Send + Sync {
    fn documents(&self) -> Result<Vec<Document>, RagError>;

    /// Stable fingerprint of the underlying data, if it has one.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

impl DocumentSource for Vec<Document> {
    fn documents(&self) -> Result<Vec<Document>, RagError> {
        Ok(self.clone())
    }
}

/// Repair history exported as CSV with a header row.
pub struct CsvRecordSource {
    path: PathBuf,
    columns: ColumnMap,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnMap) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }

    fn ensure_present(&self) -> Result<(), RagError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(RagError::Configuration(format!(
                    "data directory not found: {}",
                    parent.display()
                )));
            }
        }
        if !self.path.is_file() {
            return Err(RagError::Configuration(format!(
                "source file not found: {}",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Parses every row into a record. Unreadable rows are skipped.
    pub fn records(&self) -> Result<Vec<RepairRecord>, RagError> {
        self.ensure_present()?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                RagError::Configuration(format!(
                    "failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| {
                RagError::Configuration(format!(
                    "failed to read header of {}: {}",
                    self.path.display(),
                    e
                ))
            })?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (line, result) in reader.byte_records().enumerate() {
            let raw = match result {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!("Skipping unreadable row {}: {}", line + 1, err);
                    continue;
                }
            };

            let row: HashMap<String, String> = headers
                .iter()
                .zip(raw.iter())
                .map(|(header, value)| {
                    (header.clone(), String::from_utf8_lossy(value).into_owned())
                })
                .collect();

            records.push(RepairRecord::from_row(&row, &self.columns));
        }

        Ok(records)
    }
}

impl DocumentSource for CsvRecordSource {
    fn documents(&self) -> Result<Vec<Document>, RagError> {
        let records = self.records()?;
        tracing::info!(
            "Read {} repair records from {}",
            records.len(),
            self.path.display()
        );

        Ok(records
            .iter()
            .enumerate()
            .map(|(idx, record)| normalize(format!("record-{}", idx), record))
            .collect())
    }

    fn fingerprint(&self) -> Option<String> {
        let bytes = fs::read(&self.path).ok()?;
        Some(hex::encode(Sha256::digest(&bytes)))
    }
}
