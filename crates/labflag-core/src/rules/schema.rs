use crate::model::Sex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table of reference ranges, loaded once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTable {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub ranges: Vec<ReferenceRange>,
}

/// One reference range rule.
///
/// A rule applies to records with the same test code whose sex equals the
/// `sex` constraint (if set) and whose age lies within `age_min..=age_max`
/// (if either bound is set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub test_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
    #[serde(alias = "low")]
    pub low_bound: Decimal,
    #[serde(alias = "high")]
    pub high_bound: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReferenceRange {
    /// Unconstrained rule for a test.
    pub fn new(test_code: impl Into<String>, low_bound: Decimal, high_bound: Decimal) -> Self {
        Self {
            test_code: test_code.into(),
            sex: None,
            age_min: None,
            age_max: None,
            low_bound,
            high_bound,
            units: None,
            note: None,
        }
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_age(mut self, age_min: Option<u32>, age_max: Option<u32>) -> Self {
        self.age_min = age_min;
        self.age_max = age_max;
        self
    }

    pub fn has_age_bracket(&self) -> bool {
        self.age_min.is_some() || self.age_max.is_some()
    }

    /// Number of optional constraints (sex, age bracket) this rule carries.
    pub fn specificity(&self) -> u8 {
        u8::from(self.sex.is_some()) + u8::from(self.has_age_bracket())
    }

    /// Whether the record's sex and age satisfy this rule's constraints.
    ///
    /// A rule with an age bracket never applies when the age is unknown.
    pub fn applies_to(&self, sex: Sex, age: Option<u32>) -> bool {
        if let Some(required) = self.sex {
            if required != sex {
                return false;
            }
        }
        if self.has_age_bracket() {
            let Some(age) = age else {
                return false;
            };
            if self.age_min.is_some_and(|min| age < min) || self.age_max.is_some_and(|max| age > max)
            {
                return false;
            }
        }
        true
    }

    /// Human-readable condition, e.g. "sex=F, age 18-64".
    pub fn condition(&self) -> String {
        let mut parts = Vec::new();
        if let Some(sex) = self.sex {
            parts.push(format!("sex={sex}"));
        }
        match (self.age_min, self.age_max) {
            (Some(min), Some(max)) => parts.push(format!("age {min}-{max}")),
            (Some(min), None) => parts.push(format!("age >= {min}")),
            (None, Some(max)) => parts.push(format!("age <= {max}")),
            (None, None) => {}
        }
        if parts.is_empty() {
            "any".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] ({})",
            self.test_code,
            self.low_bound,
            self.high_bound,
            self.condition()
        )
    }
}
