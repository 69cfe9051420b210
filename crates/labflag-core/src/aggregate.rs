use crate::classify::outcome::FlagResult;
use crate::error::LabError;
use crate::model::{CanonicalField, CanonicalRecord};
use crate::parsing::normalize::SynonymIndex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A canonical field records can be grouped by (everything except `value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    PatientId,
    Sex,
    Age,
    TestCode,
    Units,
    Date,
}

impl GroupField {
    /// Resolve a field name or any configured alias of it
    /// (`test_name` resolves to `test_code`).
    pub fn resolve(name: &str, synonyms: &SynonymIndex) -> Result<GroupField, LabError> {
        let field = synonyms
            .lookup(name)
            .ok_or_else(|| LabError::Config(format!("unknown group-by field '{name}'")))?;
        GroupField::try_from(field)
    }

    pub fn as_str(&self) -> &'static str {
        CanonicalField::from(*self).as_str()
    }

    /// The record's value for this field; `None` when absent.
    pub fn value_of(&self, record: &CanonicalRecord) -> Option<String> {
        match self {
            GroupField::PatientId => Some(record.patient_id.clone()),
            GroupField::Sex => Some(record.sex.to_string()),
            GroupField::Age => record.age.map(|a| a.to_string()),
            GroupField::TestCode => Some(record.test_code.clone()),
            GroupField::Units => record.units.clone(),
            GroupField::Date => record.date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<GroupField> for CanonicalField {
    fn from(field: GroupField) -> Self {
        match field {
            GroupField::PatientId => CanonicalField::PatientId,
            GroupField::Sex => CanonicalField::Sex,
            GroupField::Age => CanonicalField::Age,
            GroupField::TestCode => CanonicalField::TestCode,
            GroupField::Units => CanonicalField::Units,
            GroupField::Date => CanonicalField::Date,
        }
    }
}

impl TryFrom<CanonicalField> for GroupField {
    type Error = LabError;

    fn try_from(field: CanonicalField) -> Result<Self, Self::Error> {
        match field {
            CanonicalField::PatientId => Ok(GroupField::PatientId),
            CanonicalField::Sex => Ok(GroupField::Sex),
            CanonicalField::Age => Ok(GroupField::Age),
            CanonicalField::TestCode => Ok(GroupField::TestCode),
            CanonicalField::Units => Ok(GroupField::Units),
            CanonicalField::Date => Ok(GroupField::Date),
            CanonicalField::Value => Err(LabError::Config(
                "cannot group by 'value'; it is the summarized quantity".into(),
            )),
        }
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One group-by field and the group's value for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKeyValue {
    pub field: GroupField,
    pub value: Option<String>,
}

/// Statistics for one distinct group-by key combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Empty for the overall row.
    pub group: Vec<GroupKeyValue>,
    pub count: usize,
    pub mean_value: Decimal,
    pub min_value: Decimal,
    pub max_value: Decimal,
    pub abnormal_count: usize,
    pub abnormal_rate: f64,
}

impl SummaryRow {
    /// "test_code=HGB, sex=F", or "ALL" for the overall row.
    pub fn label(&self) -> String {
        if self.group.is_empty() {
            return "ALL".to_string();
        }
        self.group
            .iter()
            .map(|k| {
                format!(
                    "{}={}",
                    k.field,
                    k.value.as_deref().unwrap_or("(missing)")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug)]
struct Accumulator {
    key: Vec<Option<String>>,
    count: usize,
    sum: Decimal,
    min: Decimal,
    max: Decimal,
    abnormal: usize,
}

impl Accumulator {
    fn new(key: Vec<Option<String>>, value: Decimal) -> Self {
        Self {
            key,
            count: 0,
            sum: Decimal::ZERO,
            min: value,
            max: value,
            abnormal: 0,
        }
    }

    /// `None` when the running sum leaves the `Decimal` range.
    fn add(&mut self, value: Decimal, flag: &FlagResult) -> Option<()> {
        self.sum = self.sum.checked_add(value)?;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if flag.status.is_abnormal() {
            self.abnormal += 1;
        }
        Some(())
    }

    fn describe(&self, fields: &[GroupField]) -> String {
        if fields.is_empty() {
            return "ALL".to_string();
        }
        fields
            .iter()
            .zip(&self.key)
            .map(|(field, value)| {
                format!("{}={}", field, value.as_deref().unwrap_or("(missing)"))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn finish(self, fields: &[GroupField]) -> SummaryRow {
        let count = Decimal::from(self.count);
        SummaryRow {
            group: fields
                .iter()
                .zip(self.key)
                .map(|(field, value)| GroupKeyValue {
                    field: *field,
                    value,
                })
                .collect(),
            count: self.count,
            mean_value: (self.sum / count).normalize(),
            min_value: self.min,
            max_value: self.max,
            abnormal_count: self.abnormal,
            abnormal_rate: (Decimal::from(self.abnormal) / count)
                .to_f64()
                .unwrap_or_default(),
        }
    }
}

/// Group records by `fields` and summarize each group.
///
/// Groups appear in the order their first record appears in the input.
/// Absent values form their own group rather than being defaulted.
/// Fails with [`LabError::SummaryOverflow`] when a group's sum exceeds the
/// `Decimal` range.
pub fn summarize<'a, I>(pairs: I, fields: &[GroupField]) -> Result<Vec<SummaryRow>, LabError>
where
    I: IntoIterator<Item = (&'a CanonicalRecord, &'a FlagResult)>,
{
    let mut groups: Vec<Accumulator> = Vec::new();
    let mut index: HashMap<Vec<Option<String>>, usize> = HashMap::new();

    for (record, flag) in pairs {
        let key: Vec<Option<String>> = fields.iter().map(|f| f.value_of(record)).collect();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(Accumulator::new(key.clone(), record.value));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        let group = &mut groups[slot];
        if group.add(record.value, flag).is_none() {
            return Err(LabError::SummaryOverflow {
                group: group.describe(fields),
                row: record.row,
            });
        }
    }

    Ok(groups.into_iter().map(|g| g.finish(fields)).collect())
}

/// Summarize all records as a single group; `None` when there are none.
pub fn summarize_overall<'a, I>(pairs: I) -> Result<Option<SummaryRow>, LabError>
where
    I: IntoIterator<Item = (&'a CanonicalRecord, &'a FlagResult)>,
{
    Ok(summarize(pairs, &[])?.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::outcome::FlagStatus;
    use crate::model::Sex;
    use crate::parsing::normalize::SynonymTable;
    use rust_decimal_macros::dec;

    fn record(test: &str, sex: Sex, age: Option<u32>, value: Decimal) -> CanonicalRecord {
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

    fn flag(status: FlagStatus) -> FlagResult {
        FlagResult {
            status,
            matched_rule: None,
            reason: String::new(),
        }
    }

    fn pairs<'a>(
        records: &'a [CanonicalRecord],
        flags: &'a [FlagResult],
    ) -> impl Iterator<Item = (&'a CanonicalRecord, &'a FlagResult)> {
        records.iter().zip(flags.iter())
    }

    #[test]
    fn test_mean_of_two_hgb_values() {
        let records = vec![
            record("HGB", Sex::M, None, dec!(12.8)),
            record("HGB", Sex::F, None, dec!(16.2)),
        ];
        let flags = vec![flag(FlagStatus::Normal), flag(FlagStatus::High)];
        let rows = summarize(pairs(&records, &flags), &[GroupField::TestCode]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group[0].value.as_deref(), Some("HGB"));
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].mean_value, dec!(14.5));
        assert_eq!(rows[0].min_value, dec!(12.8));
        assert_eq!(rows[0].max_value, dec!(16.2));
        assert_eq!(rows[0].abnormal_count, 1);
        assert!((rows[0].abnormal_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_seen_order() {
        let records = vec![
            record("WBC", Sex::M, None, dec!(5)),
            record("GLU", Sex::M, None, dec!(80)),
            record("WBC", Sex::F, None, dec!(6)),
            record("ALT", Sex::F, None, dec!(20)),
        ];
        let flags = vec![flag(FlagStatus::Normal); 4];
        let first = summarize(pairs(&records, &flags), &[GroupField::TestCode]).unwrap();
        let labels: Vec<String> = first.iter().map(SummaryRow::label).collect();
        assert_eq!(labels, ["test_code=WBC", "test_code=GLU", "test_code=ALT"]);

        let second = summarize(pairs(&records, &flags), &[GroupField::TestCode]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_test_not_abnormal() {
        let records = vec![
            record("TSH", Sex::F, None, dec!(2)),
            record("TSH", Sex::F, None, dec!(9)),
        ];
        let flags = vec![flag(FlagStatus::UnknownTest), flag(FlagStatus::UnknownTest)];
        let rows = summarize(pairs(&records, &flags), &[GroupField::TestCode]).unwrap();
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].abnormal_count, 0);
        assert_eq!(rows[0].abnormal_rate, 0.0);
    }

    #[test]
    fn test_absent_values_form_own_group() {
        let records = vec![
            record("GLU", Sex::F, Some(40), dec!(80)),
            record("GLU", Sex::F, None, dec!(90)),
            record("GLU", Sex::F, Some(40), dec!(100)),
        ];
        let flags = vec![flag(FlagStatus::Normal); 3];
        let rows = summarize(
            pairs(&records, &flags),
            &[GroupField::TestCode, GroupField::Age],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].group[1].value, None);
        assert_eq!(rows[1].label(), "test_code=GLU, age=(missing)");
    }

    #[test]
    fn test_overall_row() {
        let records = vec![
            record("GLU", Sex::F, None, dec!(65)),
            record("WBC", Sex::M, None, dec!(5)),
        ];
        let flags = vec![flag(FlagStatus::Low), flag(FlagStatus::Normal)];
        let overall = summarize_overall(pairs(&records, &flags)).unwrap().unwrap();
        assert!(overall.group.is_empty());
        assert_eq!(overall.label(), "ALL");
        assert_eq!(overall.count, 2);
        assert_eq!(overall.mean_value, dec!(35));
        assert!(summarize_overall(pairs(&[], &[])).unwrap().is_none());
    }

    #[test]
    fn test_sum_overflow_is_an_error() {
        let records = vec![
            record("GLU", Sex::F, None, dec!(1)),
            record("GLU", Sex::M, None, Decimal::MAX),
        ];
        let flags = vec![flag(FlagStatus::Normal); 2];
        match summarize(pairs(&records, &flags), &[GroupField::TestCode]) {
            Err(LabError::SummaryOverflow { group, .. }) => assert_eq!(group, "test_code=GLU"),
            other => panic!("expected overflow error, got {other:?}"),
        }
        assert!(summarize_overall(pairs(&records, &flags)).is_err());
    }

    #[test]
    fn test_resolve_group_field_aliases() {
        let idx = SynonymTable::default().index().unwrap();
        assert_eq!(
            GroupField::resolve("test_name", &idx).unwrap(),
            GroupField::TestCode
        );
        assert_eq!(GroupField::resolve("Gender", &idx).unwrap(), GroupField::Sex);
        assert!(GroupField::resolve("value", &idx).is_err());
        assert!(GroupField::resolve("colour", &idx).is_err());
    }
}
