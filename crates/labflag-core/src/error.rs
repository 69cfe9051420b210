use std::path::PathBuf;

use crate::model::CanonicalField;
use crate::rules::schema::ReferenceRange;

#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error(
        "missing mandatory column(s) {}; observed columns: [{}]",
        format_fields(missing),
        columns.join(", ")
    )]
    Schema {
        missing: Vec<CanonicalField>,
        columns: Vec<String>,
    },

    #[error("ambiguous reference ranges for test '{test_code}' at row {row}: {first} and {second} are equally specific")]
    AmbiguousRule {
        test_code: String,
        row: usize,
        first: Box<ReferenceRange>,
        second: Box<ReferenceRange>,
    },

    #[error("sum of values for group {group} overflowed at row {row}")]
    SummaryOverflow { group: String, row: usize },

    #[error("failed to load range table from {path}: {reason}")]
    RangeTableLoad { path: PathBuf, reason: String },

    #[error("invalid range table: {0}")]
    RangeTableInvalid(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read input table: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
