use labflag_core::error::LabError;
use labflag_core::rules::builtin;
use labflag_core::rules::overlapping_rules;
use labflag_core::rules::schema::RangeTable;
use std::collections::BTreeSet;
use std::path::Path;

pub fn list() -> Result<(), LabError> {
    println!("Available predefined range tables:\n");
    for name in builtin::PRESETS {
        let table = builtin::load_preset(name)?;
        println!("  {:<8} {} (v{})", name, table.name, table.version);
        if let Some(ref desc) = table.description {
            println!("           {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn explain(preset: &str) -> Result<(), LabError> {
    let table = builtin::load_preset(preset)?;

    println!("{} (version {})\n", table.name, table.version);
    if let Some(ref desc) = table.description {
        println!("{}\n", desc);
    }

    println!("A value below the low bound is flagged low, above the high bound high.");
    println!("Values equal to a bound are normal. When several ranges apply to a");
    println!("record, the one constrained by both sex and age wins over one");
    println!("constrained by either, which wins over an unconstrained range.\n");

    let test_width = table
        .ranges
        .iter()
        .map(|r| r.test_code.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "  {:<tw$}  {:<18}  {:>8}  {:>8}  Units",
        "Test",
        "Applies to",
        "Low",
        "High",
        tw = test_width
    );
    println!("  {}", "-".repeat(test_width + 52));

    for range in &table.ranges {
        println!(
            "  {:<tw$}  {:<18}  {:>8}  {:>8}  {}",
            range.test_code,
            range.condition(),
            range.low_bound.to_string(),
            range.high_bound.to_string(),
            range.units.as_deref().unwrap_or("-"),
            tw = test_width
        );
        if let Some(ref note) = range.note {
            println!("  {:<tw$}  {}", "", note, tw = test_width);
        }
    }
    println!();

    Ok(())
}

pub fn schema() -> Result<(), LabError> {
    print!(
        r#"JSON Range Table Schema
=======================

A range table lists reference intervals per lab test. When you run
`labflag analyze`, every cleaned value is compared against the most
specific range that applies to its record.

Top-level fields:
  name          (string, required)  Human-readable name of the table
  description   (string, optional)  What this table is for
  version       (string, required)  Version identifier (e.g., "2025.1")
  ranges        (array, required)   List of reference ranges (see below)

Each entry in the "ranges" array:
  test_code     (string, required)  Test code as it appears after cleaning
                                    (trimmed, upper-case), e.g. "HGB".
  low_bound     (string, required)  Lowest normal value, inclusive.
  high_bound    (string, required)  Highest normal value, inclusive.
                                    Bounds are strings holding decimal
                                    numbers (e.g., "12.0", "4.5").
  sex           (string, optional)  "M" or "F". Omit to apply to any sex.
                                    Records with unknown sex only match
                                    ranges without this field.
  age_min       (integer, optional) Lowest age in years, inclusive.
  age_max       (integer, optional) Highest age in years, inclusive.
                                    A range with either age field never
                                    applies to a record without an age.
  units         (string, optional)  Units for display and the flags file.
  note          (string, optional)  Source or explanation.

Example:
{{
  "name": "Clinic adult ranges",
  "description": "Ranges used by the outpatient lab",
  "version": "1.0",
  "ranges": [
    {{ "test_code": "HGB", "sex": "M", "low_bound": "13.5", "high_bound": "17.5", "units": "g/dL" }},
    {{ "test_code": "HGB", "sex": "F", "low_bound": "12.0", "high_bound": "15.5", "units": "g/dL" }},
    {{ "test_code": "HGB", "low_bound": "12.0", "high_bound": "16.0", "units": "g/dL" }},
    {{ "test_code": "GLU", "age_min": 18, "low_bound": "70", "high_bound": "99", "units": "mg/dL" }}
  ]
}}

Note: bounds must be quoted strings, not bare numbers, to preserve exact
decimal precision (e.g., "4.5" not 4.5).

Two ranges for the same test that can both apply to one record with the
same number of constraints make a run fail. `labflag ranges validate`
reports such pairs.
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), LabError> {
    let table = labflag_core::rules::load_ranges(file)?;

    let tests: BTreeSet<&str> = table.ranges.iter().map(|r| r.test_code.as_str()).collect();
    println!("Range table '{}' (v{}) is valid.", table.name, table.version);
    println!(
        "  Ranges: {} across {} test(s): {}",
        table.ranges.len(),
        tests.len(),
        tests.iter().copied().collect::<Vec<_>>().join(", ")
    );

    let warnings = range_warnings(&table);
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}

/// Problems that are legal in a table but show up at analysis time.
fn range_warnings(table: &RangeTable) -> Vec<String> {
    let mut warnings: Vec<String> = overlapping_rules(table)
        .into_iter()
        .map(|(a, b)| format!("{a} and {b} can both apply to one record (ambiguous)"))
        .collect();

    let tests: BTreeSet<&str> = table.ranges.iter().map(|r| r.test_code.as_str()).collect();
    for test in tests {
        let has_fallback = table
            .ranges
            .iter()
            .any(|r| r.test_code == test && r.specificity() == 0);
        if !has_fallback {
            warnings.push(format!(
                "test '{test}' has no unconstrained range; records with unknown sex or age may match none"
            ));
        }
    }

    warnings
}
