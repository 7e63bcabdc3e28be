//! Turns raw maintenance-order rows into indexable documents.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentMetadata};

/// Placeholder written into document prose for a missing field.
pub const MISSING_FIELD: &str = "N/A";

// ISO first, then day-first. `%.f` also accepts a missing fraction.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];

// Date-only cells count as midnight.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Source column headers for each record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub order_id: String,
    pub equipment_type: String,
    pub equipment: String,
    pub maintenance_type: String,
    pub brand: String,
    pub duration: String,
    pub started_at: String,
    pub finished_at: String,
    pub service_type: String,
    pub complement: String,
    pub resolution: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            order_id: "OS".to_string(),
            equipment_type: "TIPO EQUIPAMENTO".to_string(),
            equipment: "EQUIPAMENTO".to_string(),
            maintenance_type: "TIPO".to_string(),
            brand: "MARCA".to_string(),
            duration: "TEMPO".to_string(),
            started_at: "HORARIO INICIO".to_string(),
            finished_at: "HORARIO FIM".to_string(),
            service_type: "TIPO DE SERVIÇO".to_string(),
            complement: "COMPLEMENTO".to_string(),
            resolution: "RESOLUÇÃO".to_string(),
        }
    }
}

/// One historical maintenance order. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairRecord {
    pub order_id: Option<String>,
    pub equipment_type: Option<String>,
    pub equipment: Option<String>,
    pub maintenance_type: Option<String>,
    pub brand: Option<String>,
    /// Hours spent on the order.
    pub duration: Option<String>,
    pub service_type: Option<String>,
    pub complement: Option<String>,
    pub resolution: Option<String>,
}

impl RepairRecord {
    /// Reads a record out of a header -> value row. Blank cells are absent.
    ///
    /// The duration column wins when filled; otherwise the duration is
    /// derived from the start and end timestamps.
    pub fn from_row(row: &HashMap<String, String>, columns: &ColumnMap) -> Self {
        let field = |name: &str| {
            row.get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let duration = field(&columns.duration).or_else(|| {
            let start = field(&columns.started_at)?;
            let end = field(&columns.finished_at)?;
            duration_hours(&start, &end).map(|hours| format!("{:.2}", hours))
        });

        Self {
            order_id: field(&columns.order_id),
            equipment_type: field(&columns.equipment_type),
            equipment: field(&columns.equipment),
            maintenance_type: field(&columns.maintenance_type),
            brand: field(&columns.brand),
            duration,
            service_type: field(&columns.service_type),
            complement: field(&columns.complement),
            resolution: field(&columns.resolution),
        }
    }
}

/// Hours between two timestamps, rounded to two decimals.
pub fn duration_hours(start: &str, end: &str) -> Option<f64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    let hours = (end - start).num_seconds() as f64 / 3600.0;
    Some((hours * 100.0).round() / 100.0)
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|format| {
                NaiveDate::parse_from_str(value, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
        })
}

/// Renders a record as a document. Never fails: missing fields become
/// `N/A` in the prose and empty strings in the metadata.
pub fn normalize(id: impl Into<String>, record: &RepairRecord) -> Document {
    let prose = |value: &Option<String>| value.as_deref().unwrap_or(MISSING_FIELD).to_string();
    let tag = |value: &Option<String>| value.clone().unwrap_or_default();

    let content = format!(
        "Maintenance record, work order {}:\n\
         - Equipment type: {}\n\
         - Equipment: {}\n\
         - Maintenance type: {}\n\
         - Brand: {}\n\
         - Maintenance duration (hours): {}\n\
         - Service type: {}\n\
         - Complement: {}\n\
         - Applied solution: {}",
        prose(&record.order_id),
        prose(&record.equipment_type),
        prose(&record.equipment),
        prose(&record.maintenance_type),
        prose(&record.brand),
        prose(&record.duration),
        prose(&record.service_type),
        prose(&record.complement),
        prose(&record.resolution),
    );

    Document {
        id: id.into(),
        content,
        metadata: DocumentMetadata {
            order_id: tag(&record.order_id),
            equipment: tag(&record.equipment),
            maintenance_type: tag(&record.maintenance_type),
            brand: tag(&record.brand),
        },
    }
}
