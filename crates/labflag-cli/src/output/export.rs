//! CSV files written by `labflag analyze`.

use labflag_core::aggregate::{GroupField, SummaryRow};
use labflag_core::classify::FlagResult;
use labflag_core::error::LabError;
use labflag_core::model::CanonicalRecord;
use labflag_core::AnalysisResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const RECORD_COLUMNS: [&str; 9] = [
    "row",
    "patient_id",
    "sex",
    "age",
    "test_code",
    "value",
    "units",
    "date",
    "date_invalid",
];

const FLAG_COLUMNS: [&str; 4] = ["flag", "ref_low", "ref_high", "ref_units"];

/// Destinations for the three output tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub cleaned: PathBuf,
    pub flags: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    /// Explicit paths win; the rest default to `<kind>_<stem>.csv` next to
    /// the input file.
    pub fn for_input(
        input: &Path,
        cleaned: Option<PathBuf>,
        flags: Option<PathBuf>,
        summary: Option<PathBuf>,
    ) -> Self {
        Self {
            cleaned: cleaned.unwrap_or_else(|| sibling(input, "cleaned")),
            flags: flags.unwrap_or_else(|| sibling(input, "flags")),
            summary: summary.unwrap_or_else(|| sibling(input, "summary")),
        }
    }
}

fn sibling(input: &Path, kind: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".into());
    input.with_file_name(format!("{kind}_{stem}.csv"))
}

pub fn write_all(
    paths: &OutputPaths,
    result: &AnalysisResult,
    group_by: &[GroupField],
) -> Result<(), LabError> {
    write_cleaned(File::create(&paths.cleaned)?, result)?;
    write_flags(File::create(&paths.flags)?, result)?;
    write_summary(File::create(&paths.summary)?, result, group_by)?;
    tracing::info!(
        cleaned = %paths.cleaned.display(),
        flags = %paths.flags.display(),
        summary = %paths.summary.display(),
        "wrote output files"
    );
    Ok(())
}

fn record_cells(record: &CanonicalRecord) -> Vec<String> {
    vec![
        record.row.to_string(),
        record.patient_id.clone(),
        record.sex.to_string(),
        record.age.map(|a| a.to_string()).unwrap_or_default(),
        record.test_code.clone(),
        record.value.to_string(),
        record.units.clone().unwrap_or_default(),
        record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        record.date_invalid.to_string(),
    ]
}

/// Status and the bounds of the matched range; bounds are empty when no
/// range applied.
fn flag_cells(flag: &FlagResult) -> [String; 4] {
    let rule = flag.matched_rule.as_ref();
    [
        flag.status.to_string(),
        rule.map(|r| r.low_bound.to_string()).unwrap_or_default(),
        rule.map(|r| r.high_bound.to_string()).unwrap_or_default(),
        rule.and_then(|r| r.units.clone()).unwrap_or_default(),
    ]
}

/// Every cleaned record with its flag, in input order.
pub fn write_cleaned<W: Write>(writer: W, result: &AnalysisResult) -> Result<(), LabError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RECORD_COLUMNS.iter().chain(&FLAG_COLUMNS))?;
    for (record, flag) in result.cleaned.iter().zip(&result.flags) {
        let mut cells = record_cells(record);
        cells.extend(flag_cells(flag));
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Low and high records with the bounds that flagged them.
pub fn write_flags<W: Write>(writer: W, result: &AnalysisResult) -> Result<(), LabError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(
        RECORD_COLUMNS
            .iter()
            .chain(&FLAG_COLUMNS)
            .chain(&["reason"]),
    )?;
    for flagged in &result.flagged {
        let mut cells = record_cells(&flagged.record);
        cells.extend(flag_cells(&flagged.flag));
        cells.push(flagged.flag.reason.clone());
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One line per group followed by the overall line, whose group cells read
/// `ALL`.
pub fn write_summary<W: Write>(
    writer: W,
    result: &AnalysisResult,
    group_by: &[GroupField],
) -> Result<(), LabError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = group_by.iter().map(GroupField::as_str).collect();
    header.extend([
        "count",
        "mean_value",
        "min_value",
        "max_value",
        "abnormal_count",
        "abnormal_rate",
    ]);
    wtr.write_record(&header)?;

    for row in &result.summary {
        let mut cells: Vec<String> = row
            .group
            .iter()
            .map(|k| k.value.clone().unwrap_or_default())
            .collect();
        cells.extend(stat_cells(row));
        wtr.write_record(cells)?;
    }
    if let Some(overall) = &result.overall {
        let mut cells: Vec<String> = group_by.iter().map(|_| "ALL".to_string()).collect();
        cells.extend(stat_cells(overall));
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

fn stat_cells(row: &SummaryRow) -> [String; 6] {
    [
        row.count.to_string(),
        row.mean_value.round_dp(4).normalize().to_string(),
        row.min_value.to_string(),
        row.max_value.to_string(),
        row.abnormal_count.to_string(),
        format!("{:.4}", row.abnormal_rate),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflag_core::config::PipelineOptions;
    use labflag_core::ingest::delimited::CsvSource;
    use labflag_core::ingest::TableSource;
    use labflag_core::rules::builtin::load_preset;

    fn result() -> AnalysisResult {
        let table = CsvSource::default()
            .read_table(
                b"patient,sex,test,value,units,date\n\
                  P1,F,HGB,16.2,g/dL,2025-01-02\n\
                  P2,M,GLU,85,mg/dL,N/A\n",
            )
            .unwrap();
        labflag_core::analyze(
            &table,
            &load_preset("demo").unwrap(),
            &PipelineOptions::default(),
        )
        .unwrap()
    }

    fn render(write: impl FnOnce(&mut Vec<u8>) -> Result<(), LabError>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_default_paths_next_to_input() {
        let paths = OutputPaths::for_input(
            Path::new("/data/labs.xlsx"),
            None,
            Some(PathBuf::from("/tmp/f.csv")),
            None,
        );
        assert_eq!(paths.cleaned, PathBuf::from("/data/cleaned_labs.csv"));
        assert_eq!(paths.flags, PathBuf::from("/tmp/f.csv"));
        assert_eq!(paths.summary, PathBuf::from("/data/summary_labs.csv"));
    }

    #[test]
    fn test_cleaned_csv() {
        let r = result();
        let out = render(|buf| write_cleaned(buf, &r));
        assert_eq!(
            out,
            "row,patient_id,sex,age,test_code,value,units,date,date_invalid,flag,ref_low,ref_high,ref_units\n\
             1,P1,F,,HGB,16.2,g/dL,2025-01-02,false,high,12.0,15.5,g/dL\n\
             2,P2,M,,GLU,85,mg/dL,,true,normal,70,99,mg/dL\n"
        );
    }

    #[test]
    fn test_cleaned_csv_unmatched_test_has_empty_bounds() {
        let table = CsvSource::default()
            .read_table(b"test,value\nXYZ,3\n")
            .unwrap();
        let r = labflag_core::analyze(
            &table,
            &load_preset("demo").unwrap(),
            &PipelineOptions::default(),
        )
        .unwrap();
        let out = render(|buf| write_cleaned(buf, &r));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(",false,unknown_test,,,"));
    }

    #[test]
    fn test_flags_csv_carries_bounds() {
        let r = result();
        let out = render(|buf| write_flags(buf, &r));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("flag,ref_low,ref_high,ref_units,reason"));
        assert!(lines[1].starts_with("1,P1,F,,HGB,16.2,g/dL,2025-01-02,false,high,12.0,15.5,g/dL,"));
    }

    #[test]
    fn test_summary_csv_with_overall() {
        let r = result();
        let out = render(|buf| write_summary(buf, &r, &[GroupField::TestCode]));
        assert_eq!(
            out,
            "test_code,count,mean_value,min_value,max_value,abnormal_count,abnormal_rate\n\
             HGB,1,16.2,16.2,16.2,1,1.0000\n\
             GLU,1,85,85,85,0,0.0000\n\
             ALL,2,50.6,16.2,85,1,0.5000\n"
        );
    }

    #[test]
    fn test_write_all_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::for_input(&dir.path().join("labs.csv"), None, None, None);
        write_all(&paths, &result(), &[GroupField::TestCode]).unwrap();
        assert!(paths.cleaned.exists());
        assert!(paths.flags.exists());
        assert!(paths.summary.exists());
    }
}
