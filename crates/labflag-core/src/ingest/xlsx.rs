use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::error::LabError;
use crate::ingest::{clean_header, TableSource};
use crate::model::{RawRow, RawTable};

/// Excel workbook reader. Reads the first sheet; its first non-empty row is
/// the header.
#[derive(Debug, Clone, Default)]
pub struct XlsxSource;

impl TableSource for XlsxSource {
    fn read_table(&self, bytes: &[u8]) -> Result<RawTable, LabError> {
        let cursor = Cursor::new(bytes);
        let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(cursor)
            .map_err(|e| LabError::Ingest(format!("failed to open xlsx: {e}")))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LabError::Ingest("workbook has no sheets".into()))?
            .map_err(|e| LabError::Ingest(format!("failed to read first sheet: {e}")))?;

        let mut rows = range
            .rows()
            .skip_while(|row| row.iter().all(|c| cell_as_string(c).is_empty()));

        let header = match rows.next() {
            Some(row) => clean_header(row.iter().map(cell_as_string)),
            None => return Err(LabError::Ingest("sheet is empty".into())),
        };

        let rows = rows
            .map(|row| {
                let mut cells: Vec<String> =
                    row.iter().take(header.len()).map(cell_as_string).collect();
                cells.resize(header.len(), String::new());
                RawRow { cells }
            })
            .collect();

        Ok(RawTable::new(header, rows))
    }

    fn backend_name(&self) -> &str {
        "xlsx"
    }
}

/// Render a cell the way it would appear in a CSV export.
///
/// Date cells become ISO dates so the date parser sees a known format.
fn cell_as_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::Empty => String::new(),
        _ => format!("{cell}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_as_string() {
        assert_eq!(cell_as_string(&Data::String("  HGB ".into())), "HGB");
        assert_eq!(cell_as_string(&Data::Float(12.8)), "12.8");
        assert_eq!(cell_as_string(&Data::Float(65.0)), "65");
        assert_eq!(cell_as_string(&Data::Int(7)), "7");
        assert_eq!(cell_as_string(&Data::Empty), "");
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        let err = XlsxSource.read_table(b"not a workbook").unwrap_err();
        assert!(matches!(err, LabError::Ingest(_)));
    }
}
