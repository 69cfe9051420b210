pub mod builtin;
pub mod schema;

use crate::error::LabError;
use crate::model::Sex;
use crate::parsing::normalize::normalize_test_code;
use schema::{RangeTable, ReferenceRange};
use std::path::Path;

/// Load a range table from a JSON file.
pub fn load_ranges(path: &Path) -> Result<RangeTable, LabError> {
    let content = std::fs::read_to_string(path).map_err(|e| LabError::RangeTableLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_ranges(&content, path)
}

/// Parse a range table from a JSON string.
pub fn parse_ranges(json: &str, source: &Path) -> Result<RangeTable, LabError> {
    let table: RangeTable = serde_json::from_str(json).map_err(|e| LabError::RangeTableLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    finalize(table)
}

/// Parse a range table from a JSON string (no file path context).
pub fn parse_ranges_str(json: &str) -> Result<RangeTable, LabError> {
    let table: RangeTable = serde_json::from_str(json).map_err(LabError::Json)?;
    finalize(table)
}

fn finalize(mut table: RangeTable) -> Result<RangeTable, LabError> {
    for range in &mut table.ranges {
        range.test_code = normalize_test_code(&range.test_code);
    }
    validate_ranges(&table)?;
    Ok(table)
}

/// Validate that a range table is well-formed.
pub fn validate_ranges(table: &RangeTable) -> Result<(), LabError> {
    if table.ranges.is_empty() {
        return Err(LabError::RangeTableInvalid("ranges must not be empty".into()));
    }

    for range in &table.ranges {
        if range.test_code.trim().is_empty() {
            return Err(LabError::RangeTableInvalid(
                "test_code must not be empty".into(),
            ));
        }

        if range.low_bound > range.high_bound {
            return Err(LabError::RangeTableInvalid(format!(
                "test '{}' ({}) has low_bound {} above high_bound {}",
                range.test_code,
                range.condition(),
                range.low_bound,
                range.high_bound
            )));
        }

        if let (Some(min), Some(max)) = (range.age_min, range.age_max) {
            if min > max {
                return Err(LabError::RangeTableInvalid(format!(
                    "test '{}' has age_min {} above age_max {}",
                    range.test_code, min, max
                )));
            }
        }

        if range.sex == Some(Sex::Unknown) {
            return Err(LabError::RangeTableInvalid(format!(
                "test '{}' has sex constraint 'unknown' (expected 'M' or 'F', or omit it)",
                range.test_code
            )));
        }
    }

    Ok(())
}

/// Pairs of rules that could both apply to one record with equal
/// specificity. Such pairs raise an ambiguity error when a matching record
/// shows up, so they are worth reporting before a run.
pub fn overlapping_rules(table: &RangeTable) -> Vec<(&ReferenceRange, &ReferenceRange)> {
    let mut pairs = Vec::new();
    for (i, a) in table.ranges.iter().enumerate() {
        for b in &table.ranges[i + 1..] {
            if a.test_code == b.test_code
                && a.specificity() == b.specificity()
                && sexes_overlap(a.sex, b.sex)
                && ages_overlap(a, b)
            {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

fn sexes_overlap(a: Option<Sex>, b: Option<Sex>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

fn ages_overlap(a: &ReferenceRange, b: &ReferenceRange) -> bool {
    if !a.has_age_bracket() || !b.has_age_bracket() {
        return true;
    }
    let lo = a.age_min.unwrap_or(0).max(b.age_min.unwrap_or(0));
    let hi = a.age_max.unwrap_or(u32::MAX).min(b.age_max.unwrap_or(u32::MAX));
    lo <= hi
}
