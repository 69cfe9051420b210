use crate::error::LabError;
use crate::model::CanonicalField;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Normalize a column name (or alias) to its comparison key.
///
/// Lowercases and drops everything that is not alphanumeric, so
/// "Patient ID", "patient_id" and "PATIENT-ID" all become "patientid".
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonicalize a test code: trimmed and upper-cased, otherwise verbatim.
pub fn normalize_test_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

static DEFAULT_ALIASES: LazyLock<BTreeMap<CanonicalField, Vec<&'static str>>> =
    LazyLock::new(|| {
        let mut m = BTreeMap::new();
        m.insert(
            CanonicalField::PatientId,
            vec!["patient_id", "patientid", "patient", "mrn", "member_id", "subject_id"],
        );
        m.insert(
            CanonicalField::Sex,
            vec!["sex", "gender", "biological_sex"],
        );
        m.insert(
            CanonicalField::Age,
            vec!["age", "age_years", "patient_age"],
        );
        m.insert(
            CanonicalField::TestCode,
            vec!["test_code", "test", "test_name", "analyte", "labtest", "lab_test"],
        );
        m.insert(
            CanonicalField::Value,
            vec!["value", "result", "result_value", "lab_value"],
        );
        m.insert(CanonicalField::Units, vec!["units", "unit", "uom"]);
        m.insert(
            CanonicalField::Date,
            vec!["date", "collection_date", "draw_date", "result_date", "reported_date"],
        );
        m
    });

/// Accepted column-name aliases per canonical field.
///
/// The canonical field name is always accepted, whether or not it is listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(field, list)| (*field, list.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

impl SynonymTable {
    /// A table containing only the canonical names.
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Add extra aliases for a field.
    pub fn extend<I, S>(&mut self, field: CanonicalField, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .entry(field)
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the normalized-key lookup.
    ///
    /// Fails when one normalized alias is claimed by two different fields.
    pub fn index(&self) -> Result<SynonymIndex, LabError> {
        let mut keys: HashMap<String, CanonicalField> = HashMap::new();

        for field in CanonicalField::ALL {
            let names = std::iter::once(field.as_str())
                .chain(self.aliases(field).iter().map(String::as_str));
            for name in names {
                let key = normalize_key(name);
                if key.is_empty() {
                    return Err(LabError::Config(format!(
                        "alias '{}' for field '{}' has no alphanumeric characters",
                        name, field
                    )));
                }
                match keys.get(&key) {
                    Some(existing) if *existing != field => {
                        return Err(LabError::Config(format!(
                            "alias '{}' is claimed by both '{}' and '{}'",
                            name, existing, field
                        )));
                    }
                    Some(_) => {}
                    None => {
                        keys.insert(key, field);
                    }
                }
            }
        }

        Ok(SynonymIndex { keys })
    }
}

/// Normalized alias → canonical field lookup built from a [`SynonymTable`].
#[derive(Debug, Clone)]
pub struct SynonymIndex {
    keys: HashMap<String, CanonicalField>,
}

impl SynonymIndex {
    /// Exact match on the normalized name; no substring matching.
    pub fn lookup(&self, name: &str) -> Option<CanonicalField> {
        self.keys.get(&normalize_key(name)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_strips_case_and_punctuation() {
        assert_eq!(normalize_key("Patient ID"), "patientid");
        assert_eq!(normalize_key("patient_id"), "patientid");
        assert_eq!(normalize_key("  Result-Value "), "resultvalue");
    }

    #[test]
    fn test_normalize_test_code() {
        assert_eq!(normalize_test_code(" hgb "), "HGB");
        assert_eq!(normalize_test_code("Hba1c"), "HBA1C");
    }

    #[test]
    fn test_default_lookup() {
        let idx = SynonymTable::default().index().unwrap();
        assert_eq!(idx.lookup("Gender"), Some(CanonicalField::Sex));
        assert_eq!(idx.lookup("Test Name"), Some(CanonicalField::TestCode));
        assert_eq!(idx.lookup("MRN"), Some(CanonicalField::PatientId));
        assert_eq!(idx.lookup("Collection Date"), Some(CanonicalField::Date));
    }

    #[test]
    fn test_no_substring_match() {
        let idx = SynonymTable::default().index().unwrap();
        assert_eq!(idx.lookup("TestDate"), None);
        assert_eq!(idx.lookup("Test"), Some(CanonicalField::TestCode));
    }

    #[test]
    fn test_canonical_name_always_accepted() {
        let idx = SynonymTable::empty().index().unwrap();
        assert_eq!(idx.lookup("TEST_CODE"), Some(CanonicalField::TestCode));
        assert_eq!(idx.lookup("result"), None);
    }

    #[test]
    fn test_extend_aliases() {
        let mut table = SynonymTable::default();
        table.extend(CanonicalField::TestCode, ["Assay"]);
        let idx = table.index().unwrap();
        assert_eq!(idx.lookup("assay"), Some(CanonicalField::TestCode));
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let mut table = SynonymTable::default();
        table.extend(CanonicalField::Units, ["Result"]);
        assert!(matches!(table.index(), Err(LabError::Config(_))));
    }
}
