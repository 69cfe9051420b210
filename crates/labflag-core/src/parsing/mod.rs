pub mod dates;
pub mod header;
pub mod normalize;
pub mod values;

use crate::model::{CanonicalRecord, RawRow, RawTable, Sex};
use dates::{DateCell, DateFormats};
use header::ColumnMapping;
use normalize::normalize_test_code;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;
use values::{parse_age, parse_value};

/// Why a non-blank row could not become a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The value cell is not numeric.
    InvalidValue { raw: String },
    MissingTestCode,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidValue { raw } if raw.is_empty() => write!(f, "missing value"),
            RejectReason::InvalidValue { raw } => write!(f, "invalid value '{raw}'"),
            RejectReason::MissingTestCode => write!(f, "missing test code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// 1-based data row number.
    pub row: usize,
    #[serde(flatten)]
    pub reason: RejectReason,
}

/// Result of cleaning one row.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanedRow {
    Record(CanonicalRecord),
    /// Every mapped cell was blank.
    Blank,
    Rejected(RejectReason),
}

/// Everything the cleaner produced for a table.
#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    pub records: Vec<CanonicalRecord>,
    pub rejections: Vec<Rejection>,
    pub blank_rows: usize,
    pub duplicate_rows: usize,
}

/// Clean a single raw row into a record, a blank marker or a rejection.
///
/// `row` is the 1-based data row number, used for the record's position and
/// as the fallback patient identifier.
pub fn clean_row(
    raw: &RawRow,
    row: usize,
    mapping: &ColumnMapping,
    formats: &DateFormats,
) -> CleanedRow {
    let cell = |idx: Option<usize>| idx.map(|i| raw.cell(i).trim()).unwrap_or("");

    if mapping
        .mapped_indices()
        .into_iter()
        .all(|i| raw.cell(i).trim().is_empty())
    {
        return CleanedRow::Blank;
    }

    let test_code = normalize_test_code(cell(Some(mapping.test_code)));
    if test_code.is_empty() {
        return CleanedRow::Rejected(RejectReason::MissingTestCode);
    }

    let raw_value = cell(Some(mapping.value));
    let Some(value) = parse_value(raw_value) else {
        return CleanedRow::Rejected(RejectReason::InvalidValue {
            raw: raw_value.to_string(),
        });
    };

    let patient_id = match cell(mapping.patient_id) {
        "" => format!("row-{row}"),
        id => id.to_string(),
    };

    let units = match cell(mapping.units) {
        "" => None,
        u => Some(u.to_string()),
    };

    let age_cell = cell(mapping.age);
    let age = parse_age(age_cell);
    if age.is_none() && !age_cell.is_empty() {
        debug!(row, "age cell is not a whole non-negative number, treating as absent");
    }

    let (date, date_invalid) = match formats.parse(cell(mapping.date)) {
        DateCell::Parsed(d) => (Some(d), false),
        DateCell::Absent => (None, false),
        DateCell::Invalid => {
            debug!(row, "date cell matched no candidate format");
            (None, true)
        }
    };

    CleanedRow::Record(CanonicalRecord {
        row,
        patient_id,
        sex: Sex::from_str_loose(cell(mapping.sex)),
        age,
        test_code,
        value,
        units,
        date,
        date_invalid,
    })
}

/// Clean every row of a table, preserving input order.
///
/// Exact duplicates (after trimming every cell) are dropped when
/// `drop_duplicates` is set; only the first occurrence is kept.
pub fn clean_rows(
    table: &RawTable,
    mapping: &ColumnMapping,
    formats: &DateFormats,
    drop_duplicates: bool,
) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();
    let mut seen: HashSet<Vec<&str>> = HashSet::new();

    for (idx, raw) in table.rows.iter().enumerate() {
        let row = idx + 1;

        let cleaned = clean_row(raw, row, mapping, formats);
        if matches!(cleaned, CleanedRow::Blank) {
            outcome.blank_rows += 1;
            continue;
        }

        if drop_duplicates {
            let key: Vec<&str> = (0..table.header.len())
                .map(|i| raw.cell(i).trim())
                .collect();
            if !seen.insert(key) {
                debug!(row, "dropping duplicate row");
                outcome.duplicate_rows += 1;
                continue;
            }
        }

        match cleaned {
            CleanedRow::Record(record) => outcome.records.push(record),
            CleanedRow::Rejected(reason) => {
                debug!(row, %reason, "row rejected");
                outcome.rejections.push(Rejection { row, reason });
            }
            CleanedRow::Blank => {}
        }
    }

    outcome
}
