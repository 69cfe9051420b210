use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed target fields every input table is reconciled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    PatientId,
    Sex,
    Age,
    TestCode,
    Value,
    Units,
    Date,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::PatientId,
        CanonicalField::Sex,
        CanonicalField::Age,
        CanonicalField::TestCode,
        CanonicalField::Value,
        CanonicalField::Units,
        CanonicalField::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::PatientId => "patient_id",
            CanonicalField::Sex => "sex",
            CanonicalField::Age => "age",
            CanonicalField::TestCode => "test_code",
            CanonicalField::Value => "value",
            CanonicalField::Units => "units",
            CanonicalField::Date => "date",
        }
    }

    /// Fields without which a run cannot produce any record.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, CanonicalField::TestCode | CanonicalField::Value)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Sex {
    pub fn from_str_loose(s: &str) -> Sex {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "man" => Sex::M,
            "f" | "female" | "woman" => Sex::F,
            _ => Sex::Unknown,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::M => write!(f, "M"),
            Sex::F => write!(f, "F"),
            Sex::Unknown => write!(f, "unknown"),
        }
    }
}

/// One data row as read from the source, cells aligned with the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    /// Cell at `idx`, or an empty string for short rows.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// An input table: the observed header plus its data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { header, rows }
    }

    /// Indices of columns whose every data cell is blank.
    ///
    /// A table without data rows has no blank columns.
    pub fn blank_columns(&self) -> Vec<usize> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        (0..self.header.len())
            .filter(|&idx| self.rows.iter().all(|r| r.cell(idx).trim().is_empty()))
            .collect()
    }

    /// Copy of the table without the given columns.
    pub fn without_columns(&self, drop: &[usize]) -> RawTable {
        let keep: Vec<usize> = (0..self.header.len())
            .filter(|idx| !drop.contains(idx))
            .collect();
        RawTable {
            header: keep.iter().map(|&i| self.header[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| RawRow {
                    cells: keep.iter().map(|&i| r.cell(i).to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// A cleaned, typed lab result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// 1-based position of the source data row (header excluded).
    pub row: usize,
    pub patient_id: String,
    pub sex: Sex,
    pub age: Option<u32>,
    pub test_code: String,
    pub value: Decimal,
    pub units: Option<String>,
    pub date: Option<NaiveDate>,
    /// Set when a non-blank date cell could not be parsed.
    #[serde(default)]
    pub date_invalid: bool,
}
