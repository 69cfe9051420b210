use crate::error::LabError;
use crate::model::CanonicalField;
use crate::parsing::normalize::SynonymIndex;
use serde::{Deserialize, Serialize};

/// What became of one input column during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "field", rename_all = "snake_case")]
pub enum ColumnStatus {
    Mapped(CanonicalField),
    /// Matched a field already claimed by an earlier column.
    Shadowed(CanonicalField),
    Unmatched,
    /// Every data cell was empty; removed before matching.
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub column: String,
    pub status: ColumnStatus,
}

/// Human-readable record of how the header was reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingReport {
    pub entries: Vec<MappingEntry>,
    /// Canonical fields with no matching column.
    pub missing: Vec<CanonicalField>,
}

impl MappingReport {
    /// One `original → canonical` line per input column.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match e.status {
                ColumnStatus::Mapped(field) => format!("{} → {}", e.column, field),
                ColumnStatus::Shadowed(field) => {
                    format!("{} → (ignored, {} already mapped)", e.column, field)
                }
                ColumnStatus::Unmatched => format!("{} → (unmatched)", e.column),
                ColumnStatus::Blank => format!("{} → (dropped, blank column)", e.column),
            })
            .collect()
    }
}

/// Resolved column positions for each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub patient_id: Option<usize>,
    pub sex: Option<usize>,
    pub age: Option<usize>,
    pub test_code: usize,
    pub value: usize,
    pub units: Option<usize>,
    pub date: Option<usize>,
}

impl ColumnMapping {
    /// Column indices of every mapped field.
    pub fn mapped_indices(&self) -> Vec<usize> {
        [
            self.patient_id,
            self.sex,
            self.age,
            Some(self.test_code),
            Some(self.value),
            self.units,
            self.date,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Map the observed header onto canonical fields.
///
/// The first column matching a field wins. Fails with a schema error when
/// `test_code` or `value` has no matching column.
pub fn map_columns(
    header: &[String],
    synonyms: &SynonymIndex,
) -> Result<(ColumnMapping, MappingReport), LabError> {
    let mut positions: Vec<(CanonicalField, usize)> = Vec::new();
    let mut entries = Vec::with_capacity(header.len());

    for (idx, column) in header.iter().enumerate() {
        let status = match synonyms.lookup(column) {
            Some(field) if positions.iter().any(|(f, _)| *f == field) => {
                ColumnStatus::Shadowed(field)
            }
            Some(field) => {
                positions.push((field, idx));
                ColumnStatus::Mapped(field)
            }
            None => ColumnStatus::Unmatched,
        };
        entries.push(MappingEntry {
            column: column.clone(),
            status,
        });
    }

    let position = |field: CanonicalField| {
        positions
            .iter()
            .find_map(|(f, idx)| (*f == field).then_some(*idx))
    };

    let missing: Vec<CanonicalField> = CanonicalField::ALL
        .into_iter()
        .filter(|f| position(*f).is_none())
        .collect();

    let (Some(test_code), Some(value)) = (
        position(CanonicalField::TestCode),
        position(CanonicalField::Value),
    ) else {
        return Err(LabError::Schema {
            missing: missing.into_iter().filter(|f| f.is_mandatory()).collect(),
            columns: header.to_vec(),
        });
    };

    let mapping = ColumnMapping {
        patient_id: position(CanonicalField::PatientId),
        sex: position(CanonicalField::Sex),
        age: position(CanonicalField::Age),
        test_code,
        value,
        units: position(CanonicalField::Units),
        date: position(CanonicalField::Date),
    };

    Ok((mapping, MappingReport { entries, missing }))
}
