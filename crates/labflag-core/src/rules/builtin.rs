use crate::error::LabError;
use crate::rules::parse_ranges_str;
use crate::rules::schema::RangeTable;

const DEMO_RANGES_JSON: &str = include_str!("../../../../rules/demo-ranges.json");

/// Available predefined range tables.
pub const PRESETS: &[&str] = &["demo"];

/// Load a predefined range table by name.
pub fn load_preset(name: &str) -> Result<RangeTable, LabError> {
    match name {
        "demo" => parse_ranges_str(DEMO_RANGES_JSON),
        _ => Err(LabError::RangeTableInvalid(format!(
            "unknown preset '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;
    use crate::rules::overlapping_rules;

    #[test]
    fn test_load_demo_preset() {
        let table = load_preset("demo").unwrap();
        assert_eq!(table.ranges.len(), 5);
        let hgb: Vec<_> = table.ranges.iter().filter(|r| r.test_code == "HGB").collect();
        assert_eq!(hgb.len(), 3);
        assert!(hgb.iter().any(|r| r.sex == Some(Sex::F)));
        assert!(hgb.iter().any(|r| r.sex.is_none()));
    }

    #[test]
    fn test_demo_preset_has_no_overlaps() {
        let table = load_preset("demo").unwrap();
        assert!(overlapping_rules(&table).is_empty());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load_preset("xyz").is_err());
    }
}
