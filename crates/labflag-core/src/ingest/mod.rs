pub mod delimited;
pub mod xlsx;

use crate::error::LabError;
use crate::model::RawTable;
use std::path::Path;

/// Trait for tabular input backends.
pub trait TableSource: Send + Sync {
    /// Read a whole table (header plus data rows) from file bytes.
    fn read_table(&self, bytes: &[u8]) -> Result<RawTable, LabError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Pick a backend from the file extension: `.csv`, `.tsv`/`.tab` or `.xlsx`.
pub fn source_for_path(path: &Path) -> Result<Box<dyn TableSource>, LabError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(Box::new(delimited::CsvSource::new(b','))),
        "tsv" | "tab" => Ok(Box::new(delimited::CsvSource::new(b'\t'))),
        "xlsx" | "xlsm" => Ok(Box::new(xlsx::XlsxSource)),
        _ => Err(LabError::Ingest(format!(
            "unsupported file type '{}' (expected .csv, .tsv or .xlsx)",
            path.display()
        ))),
    }
}

/// Read a table from disk, choosing the backend by extension.
pub fn read_table(path: &Path) -> Result<RawTable, LabError> {
    let source = source_for_path(path)?;
    let bytes = std::fs::read(path)?;
    let table = source.read_table(&bytes)?;
    tracing::info!(
        backend = source.backend_name(),
        columns = table.header.len(),
        rows = table.rows.len(),
        "read input table"
    );
    Ok(table)
}

/// Trim header names, dropping a leading byte-order mark.
fn clean_header<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim_start_matches('\u{feff}').trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_for_extension() {
        assert_eq!(
            source_for_path(Path::new("labs.CSV")).unwrap().backend_name(),
            "csv"
        );
        assert_eq!(
            source_for_path(Path::new("labs.tsv")).unwrap().backend_name(),
            "tsv"
        );
        assert_eq!(
            source_for_path(Path::new("labs.xlsx")).unwrap().backend_name(),
            "xlsx"
        );
        assert!(source_for_path(Path::new("labs.json")).is_err());
        assert!(source_for_path(Path::new("labs")).is_err());
    }

    #[test]
    fn test_clean_header() {
        assert_eq!(
            clean_header(["\u{feff}Patient ID", " Test "]),
            vec!["Patient ID".to_string(), "Test".to_string()]
        );
    }
}
