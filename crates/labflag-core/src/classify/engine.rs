use crate::classify::outcome::{FlagResult, FlagStatus};
use crate::error::LabError;
use crate::model::CanonicalRecord;
use crate::rules::schema::{RangeTable, ReferenceRange};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Resolves and applies reference ranges for records.
///
/// Rules are indexed by test code once at construction and never change
/// afterwards.
#[derive(Debug, Clone)]
pub struct RangeEngine {
    by_test: HashMap<String, Vec<ReferenceRange>>,
}

impl RangeEngine {
    pub fn new(table: &RangeTable) -> Self {
        let mut by_test: HashMap<String, Vec<ReferenceRange>> = HashMap::new();
        for range in &table.ranges {
            by_test
                .entry(range.test_code.clone())
                .or_default()
                .push(range.clone());
        }
        Self { by_test }
    }

    /// Whether any rule exists for the test code.
    pub fn knows_test(&self, test_code: &str) -> bool {
        self.by_test.contains_key(test_code)
    }

    /// Pick the rule that applies to a record.
    ///
    /// Among rules whose constraints the record satisfies, the most specific
    /// wins. Two equally specific winners are an authoring error in the
    /// table and fail with [`LabError::AmbiguousRule`].
    pub fn resolve(&self, record: &CanonicalRecord) -> Result<Option<&ReferenceRange>, LabError> {
        let Some(rules) = self.by_test.get(&record.test_code) else {
            return Ok(None);
        };

        let mut best: Option<&ReferenceRange> = None;
        let mut tied: Option<&ReferenceRange> = None;

        for rule in rules.iter().filter(|r| r.applies_to(record.sex, record.age)) {
            match best.map(ReferenceRange::specificity) {
                None => best = Some(rule),
                Some(current) if rule.specificity() > current => {
                    best = Some(rule);
                    tied = None;
                }
                Some(current) if rule.specificity() == current => {
                    tied.get_or_insert(rule);
                }
                Some(_) => {}
            }
        }

        match (best, tied) {
            (Some(first), Some(second)) => Err(LabError::AmbiguousRule {
                test_code: record.test_code.clone(),
                row: record.row,
                first: Box::new(first.clone()),
                second: Box::new(second.clone()),
            }),
            (best, _) => Ok(best),
        }
    }

    /// Classify one record.
    pub fn flag(&self, record: &CanonicalRecord) -> Result<FlagResult, LabError> {
        let Some(rule) = self.resolve(record)? else {
            let reason = if self.knows_test(&record.test_code) {
                format!(
                    "{}: no range applies to sex={}, age={}",
                    record.test_code,
                    record.sex,
                    record
                        .age
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "unknown".into())
                )
            } else {
                format!("{}: no reference range configured", record.test_code)
            };
            return Ok(FlagResult {
                status: FlagStatus::UnknownTest,
                matched_rule: None,
                reason,
            });
        };

        let status = compare(record.value, rule);
        let reason = match status {
            FlagStatus::Low => format!(
                "{}: {} < {} ({}) -> low",
                record.test_code,
                record.value,
                rule.low_bound,
                rule.condition()
            ),
            FlagStatus::High => format!(
                "{}: {} > {} ({}) -> high",
                record.test_code,
                record.value,
                rule.high_bound,
                rule.condition()
            ),
            _ => format!(
                "{}: {} within [{}, {}] ({}) -> normal",
                record.test_code,
                record.value,
                rule.low_bound,
                rule.high_bound,
                rule.condition()
            ),
        };

        Ok(FlagResult {
            status,
            matched_rule: Some(rule.clone()),
            reason,
        })
    }
}

/// Inclusive bounds: a value equal to either bound is normal.
fn compare(value: Decimal, rule: &ReferenceRange) -> FlagStatus {
    if value < rule.low_bound {
        FlagStatus::Low
    } else if value > rule.high_bound {
        FlagStatus::High
    } else {
        FlagStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;
    use rust_decimal_macros::dec;

    fn table(ranges: Vec<ReferenceRange>) -> RangeTable {
        RangeTable {
            name: "Test".into(),
            description: None,
            version: "1.0".into(),
            ranges,
        }
    }

    fn record(test: &str, value: Decimal, sex: Sex, age: Option<u32>) -> CanonicalRecord {
        CanonicalRecord {
            row: 1,
            patient_id: "P1".into(),
            sex,
            age,
            test_code: test.into(),
            value,
            units: None,
            date: None,
            date_invalid: false,
        }
    }

    fn engine() -> RangeEngine {
        RangeEngine::new(&table(vec![
            ReferenceRange::new("HGB", dec!(12.0), dec!(16.0)),
            ReferenceRange::new("HGB", dec!(13.5), dec!(17.5)).with_sex(Sex::M),
            ReferenceRange::new("HGB", dec!(11.0), dec!(14.0))
                .with_sex(Sex::F)
                .with_age(Some(65), None),
            ReferenceRange::new("GLU", dec!(70), dec!(99)),
        ]))
    }

    #[test]
    fn test_boundaries_are_normal() {
        let e = engine();
        for v in [dec!(70), dec!(99), dec!(85)] {
            let flag = e.flag(&record("GLU", v, Sex::Unknown, None)).unwrap();
            assert_eq!(flag.status, FlagStatus::Normal, "value {v}");
        }
        assert_eq!(
            e.flag(&record("GLU", dec!(69.99), Sex::F, None)).unwrap().status,
            FlagStatus::Low
        );
        assert_eq!(
            e.flag(&record("GLU", dec!(99.01), Sex::F, None)).unwrap().status,
            FlagStatus::High
        );
    }

    #[test]
    fn test_unknown_test() {
        let flag = engine()
            .flag(&record("TSH", dec!(2.1), Sex::F, Some(40)))
            .unwrap();
        assert_eq!(flag.status, FlagStatus::UnknownTest);
        assert!(flag.matched_rule.is_none());
    }

    #[test]
    fn test_sex_specific_rule_wins() {
        let flag = engine()
            .flag(&record("HGB", dec!(13.0), Sex::M, None))
            .unwrap();
        assert_eq!(flag.status, FlagStatus::Low);
        assert_eq!(flag.matched_rule.unwrap().sex, Some(Sex::M));
    }

    #[test]
    fn test_unknown_sex_falls_back_to_unconstrained() {
        let flag = engine()
            .flag(&record("HGB", dec!(13.0), Sex::Unknown, None))
            .unwrap();
        assert_eq!(flag.status, FlagStatus::Normal);
        assert_eq!(flag.matched_rule.unwrap().specificity(), 0);
    }

    #[test]
    fn test_sex_and_age_rule_beats_unconstrained() {
        let flag = engine()
            .flag(&record("HGB", dec!(15.0), Sex::F, Some(70)))
            .unwrap();
        assert_eq!(flag.status, FlagStatus::High);
        assert_eq!(flag.matched_rule.unwrap().specificity(), 2);
    }

    #[test]
    fn test_missing_age_skips_age_rule() {
        let flag = engine()
            .flag(&record("HGB", dec!(15.0), Sex::F, None))
            .unwrap();
        assert_eq!(flag.status, FlagStatus::Normal);
        assert_eq!(flag.matched_rule.unwrap().specificity(), 0);
    }

    #[test]
    fn test_known_test_without_applicable_rule() {
        let e = RangeEngine::new(&table(vec![
            ReferenceRange::new("PSA", dec!(0), dec!(4)).with_sex(Sex::M),
        ]));
        let flag = e.flag(&record("PSA", dec!(1), Sex::F, None)).unwrap();
        assert_eq!(flag.status, FlagStatus::UnknownTest);
        assert!(flag.reason.contains("no range applies"));
    }

    #[test]
    fn test_equal_specificity_is_ambiguous() {
        let e = RangeEngine::new(&table(vec![
            ReferenceRange::new("HGB", dec!(12.0), dec!(15.5)).with_sex(Sex::F),
            ReferenceRange::new("HGB", dec!(11.5), dec!(15.0)).with_age(Some(18), None),
        ]));
        match e.flag(&record("HGB", dec!(13.0), Sex::F, Some(30))) {
            Err(LabError::AmbiguousRule {
                test_code,
                first,
                second,
                ..
            }) => {
                assert_eq!(test_code, "HGB");
                assert_eq!(first.sex, Some(Sex::F));
                assert_eq!(second.age_min, Some(18));
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_tie_resolved_by_more_specific_rule() {
        let e = RangeEngine::new(&table(vec![
            ReferenceRange::new("HGB", dec!(12.0), dec!(15.5)).with_sex(Sex::F),
            ReferenceRange::new("HGB", dec!(11.5), dec!(15.0)).with_age(Some(18), None),
            ReferenceRange::new("HGB", dec!(11.0), dec!(14.0))
                .with_sex(Sex::F)
                .with_age(Some(18), None),
        ]));
        let flag = e.flag(&record("HGB", dec!(14.5), Sex::F, Some(30))).unwrap();
        assert_eq!(flag.status, FlagStatus::High);
    }
}
