use crate::model::CanonicalRecord;
use crate::rules::schema::ReferenceRange;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Low,
    Normal,
    High,
    UnknownTest,
}

impl FlagStatus {
    /// Low or high; unknown tests are never abnormal.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, FlagStatus::Low | FlagStatus::High)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagStatus::Low => "low",
            FlagStatus::Normal => "normal",
            FlagStatus::High => "high",
            FlagStatus::UnknownTest => "unknown_test",
        }
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one record against the range table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagResult {
    pub status: FlagStatus,
    /// The rule that decided the status; absent for unknown tests.
    pub matched_rule: Option<ReferenceRange>,
    /// Human-readable explanation of the classification.
    pub reason: String,
}

/// A record together with its flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRecord {
    pub record: CanonicalRecord,
    pub flag: FlagResult,
}
