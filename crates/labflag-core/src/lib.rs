pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parsing;
pub mod rules;

use aggregate::SummaryRow;
use classify::{FlagResult, FlaggedRecord, RangeEngine};
use config::PipelineOptions;
use error::LabError;
use model::{CanonicalRecord, RawTable};
use parsing::header::{map_columns, ColumnMapping, ColumnStatus, MappingEntry, MappingReport};
use parsing::normalize::SynonymTable;
use parsing::Rejection;
use rules::schema::RangeTable;
use serde::Serialize;

/// Row accounting for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowTally {
    pub rows_read: usize,
    pub cleaned: usize,
    pub blank_rows: usize,
    pub duplicate_rows: usize,
    pub rejected: usize,
    /// Cleaned records whose date cell could not be parsed.
    pub invalid_dates: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub mapping: MappingReport,
    pub cleaned: Vec<CanonicalRecord>,
    /// One flag per cleaned record, same order.
    pub flags: Vec<FlagResult>,
    /// Low and high records only.
    pub flagged: Vec<FlaggedRecord>,
    pub summary: Vec<SummaryRow>,
    pub overall: Option<SummaryRow>,
    pub rejections: Vec<Rejection>,
    pub tally: RowTally,
}

/// Main API entry point: clean, flag and summarize a raw lab table.
///
/// Fails without partial output on a schema error (no `test_code` or `value`
/// column), when two equally specific reference ranges apply to a record, or
/// when a summary sum overflows.
/// Unparseable rows are reported in `rejections` instead.
pub fn analyze(
    table: &RawTable,
    ranges: &RangeTable,
    options: &PipelineOptions,
) -> Result<AnalysisResult, LabError> {
    let (table, mapping, report) = prepare(table, &options.synonyms)?;

    let outcome = parsing::clean_rows(
        &table,
        &mapping,
        &options.date_formats,
        options.drop_duplicates,
    );
    tracing::info!(
        records = outcome.records.len(),
        rejected = outcome.rejections.len(),
        blank = outcome.blank_rows,
        duplicates = outcome.duplicate_rows,
        "cleaned rows"
    );

    let engine = RangeEngine::new(ranges);
    let flags = outcome
        .records
        .iter()
        .map(|record| engine.flag(record))
        .collect::<Result<Vec<_>, _>>()?;

    let flagged: Vec<FlaggedRecord> = outcome
        .records
        .iter()
        .zip(&flags)
        .filter(|(_, flag)| flag.status.is_abnormal())
        .map(|(record, flag)| FlaggedRecord {
            record: record.clone(),
            flag: flag.clone(),
        })
        .collect();
    tracing::info!(
        ruleset = %ranges.name,
        flagged = flagged.len(),
        "flagged records"
    );

    let summary = aggregate::summarize(outcome.records.iter().zip(&flags), &options.group_by)?;
    let overall = aggregate::summarize_overall(outcome.records.iter().zip(&flags))?;

    let tally = RowTally {
        rows_read: table.rows.len(),
        cleaned: outcome.records.len(),
        blank_rows: outcome.blank_rows,
        duplicate_rows: outcome.duplicate_rows,
        rejected: outcome.rejections.len(),
        invalid_dates: outcome.records.iter().filter(|r| r.date_invalid).count(),
    };

    Ok(AnalysisResult {
        mapping: report,
        cleaned: outcome.records,
        flags,
        flagged,
        summary,
        overall,
        rejections: outcome.rejections,
        tally,
    })
}

/// Reconcile a table's header without cleaning any rows.
pub fn map_header(table: &RawTable, options: &PipelineOptions) -> Result<MappingReport, LabError> {
    prepare(table, &options.synonyms).map(|(_, _, report)| report)
}

/// Drop blank columns and map the remaining header.
///
/// The returned report lists every original column in input order, blank
/// ones included.
fn prepare(
    table: &RawTable,
    synonyms: &SynonymTable,
) -> Result<(RawTable, ColumnMapping, MappingReport), LabError> {
    let blank = table.blank_columns();
    if !blank.is_empty() {
        tracing::debug!(count = blank.len(), "dropping blank columns");
    }
    let trimmed = table.without_columns(&blank);

    let index = synonyms.index()?;
    let (mapping, mut report) = map_columns(&trimmed.header, &index)?;

    let mut mapped = std::mem::take(&mut report.entries).into_iter();
    report.entries = table
        .header
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| {
            if blank.contains(&idx) {
                Some(MappingEntry {
                    column: column.clone(),
                    status: ColumnStatus::Blank,
                })
            } else {
                mapped.next()
            }
        })
        .collect();

    for line in report.lines() {
        tracing::debug!("{line}");
    }

    Ok((trimmed, mapping, report))
}
