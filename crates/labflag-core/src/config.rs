use crate::aggregate::GroupField;
use crate::error::LabError;
use crate::model::CanonicalField;
use crate::parsing::dates::{DateFormats, DEFAULT_DATE_FORMATS};
use crate::parsing::normalize::{SynonymIndex, SynonymTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Pipeline settings as written in an options file.
///
/// Every key is optional:
///
/// ```json
/// {
///   "group_by": ["test_code", "sex"],
///   "date_formats": ["DD/MM/YYYY", "YYYY-MM-DD"],
///   "synonyms": { "test_code": ["assay"] },
///   "drop_duplicates": true
/// }
/// ```
///
/// `synonyms` adds to the built-in alias table rather than replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsFile {
    pub group_by: Vec<String>,
    pub date_formats: Vec<String>,
    pub synonyms: BTreeMap<CanonicalField, Vec<String>>,
    pub drop_duplicates: bool,
}

impl Default for OptionsFile {
    fn default() -> Self {
        Self {
            group_by: vec![CanonicalField::TestCode.as_str().to_string()],
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            synonyms: BTreeMap::new(),
            drop_duplicates: true,
        }
    }
}

/// Validated configuration consumed by [`crate::analyze`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub group_by: Vec<GroupField>,
    pub date_formats: DateFormats,
    pub synonyms: SynonymTable,
    pub drop_duplicates: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            group_by: vec![GroupField::TestCode],
            date_formats: DateFormats::default(),
            synonyms: SynonymTable::default(),
            drop_duplicates: true,
        }
    }
}

impl PipelineOptions {
    /// Validate an options file into pipeline options.
    pub fn from_file_options(file: &OptionsFile) -> Result<Self, LabError> {
        let mut synonyms = SynonymTable::default();
        for (field, aliases) in &file.synonyms {
            synonyms.extend(*field, aliases.iter().cloned());
        }
        let index = synonyms.index()?;

        Ok(Self {
            group_by: resolve_group_by(&file.group_by, &index)?,
            date_formats: DateFormats::new(&file.date_formats)?,
            synonyms,
            drop_duplicates: file.drop_duplicates,
        })
    }

    /// Replace the group-by list with field names (aliases allowed).
    pub fn set_group_by<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), LabError> {
        let index = self.synonyms.index()?;
        self.group_by = resolve_group_by(names, &index)?;
        Ok(())
    }
}

fn resolve_group_by<S: AsRef<str>>(
    names: &[S],
    index: &SynonymIndex,
) -> Result<Vec<GroupField>, LabError> {
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let field = GroupField::resolve(name.as_ref(), index)?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Ok(fields)
}

/// Load pipeline options from a JSON file.
pub fn load_options(path: &Path) -> Result<PipelineOptions, LabError> {
    let content = std::fs::read_to_string(path)?;
    parse_options_str(&content)
}

/// Parse pipeline options from a JSON string.
pub fn parse_options_str(json: &str) -> Result<PipelineOptions, LabError> {
    let file: OptionsFile = serde_json::from_str(json)?;
    PipelineOptions::from_file_options(&file)
}
