use crate::error::LabError;
use crate::ingest::{clean_header, TableSource};
use crate::model::{RawRow, RawTable};

/// Delimited text reader built on the `csv` crate.
///
/// Rows may be shorter or longer than the header; short rows are padded
/// with empty cells and extra cells are dropped.
#[derive(Debug, Clone)]
pub struct CsvSource {
    delimiter: u8,
}

impl CsvSource {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl TableSource for CsvSource {
    fn read_table(&self, bytes: &[u8]) -> Result<RawTable, LabError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(bytes);

        let header = clean_header(reader.headers()?.iter());
        if header.iter().all(String::is_empty) {
            return Err(LabError::Ingest("input has no header row".into()));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut cells: Vec<String> = record
                .iter()
                .take(header.len())
                .map(str::to_string)
                .collect();
            cells.resize(header.len(), String::new());
            rows.push(RawRow { cells });
        }

        Ok(RawTable::new(header, rows))
    }

    fn backend_name(&self) -> &str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv() {
        let data = "\u{feff}PatientID,Test,Result\nP1,HGB,12.8\nP2,WBC\n,,\n";
        let table = CsvSource::default().read_table(data.as_bytes()).unwrap();
        assert_eq!(table.header, vec!["PatientID", "Test", "Result"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].cells, vec!["P1", "HGB", "12.8"]);
        assert_eq!(table.rows[1].cells, vec!["P2", "WBC", ""]);
    }

    #[test]
    fn test_read_tsv_with_quoted_thousands() {
        let data = "test\tvalue\nPLT\t\"1,234\"\n";
        let table = CsvSource::new(b'\t').read_table(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0].cells, vec!["PLT", "1,234"]);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(CsvSource::default().read_table(b"").is_err());
    }
}
