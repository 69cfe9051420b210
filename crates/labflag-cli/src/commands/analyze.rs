use labflag_core::config::{load_options, PipelineOptions};
use labflag_core::error::LabError;
use labflag_core::rules::builtin;
use labflag_core::rules::schema::RangeTable;
use std::path::{Path, PathBuf};

use crate::output;
use crate::output::export::OutputPaths;
use crate::output::OutputFormat;

pub struct AnalyzeArgs {
    pub input_file: PathBuf,
    pub ranges: Option<PathBuf>,
    pub preset: Option<String>,
    pub group_by: Vec<String>,
    pub config: Option<PathBuf>,
    pub out_clean: Option<PathBuf>,
    pub out_flags: Option<PathBuf>,
    pub out_summary: Option<PathBuf>,
    pub output_format: OutputFormat,
}

pub fn run(args: AnalyzeArgs) -> Result<(), LabError> {
    let ranges = load_range_table(args.ranges.as_deref(), args.preset.as_deref())?;

    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => PipelineOptions::default(),
    };
    if !args.group_by.is_empty() {
        options.set_group_by(&args.group_by)?;
    }

    let table = labflag_core::ingest::read_table(&args.input_file)?;
    let result = labflag_core::analyze(&table, &ranges, &options)?;

    let paths = OutputPaths::for_input(
        &args.input_file,
        args.out_clean,
        args.out_flags,
        args.out_summary,
    );
    output::export::write_all(&paths, &result, &options.group_by)?;

    match args.output_format {
        OutputFormat::Json => output::json::print(&result)?,
        OutputFormat::Table => output::table::print(&result, &ranges.name),
    }

    eprintln!(
        "Wrote {} cleaned record(s) to {}",
        result.cleaned.len(),
        paths.cleaned.display()
    );
    eprintln!(
        "Wrote {} flagged record(s) to {}",
        result.flagged.len(),
        paths.flags.display()
    );
    eprintln!(
        "Wrote {} summary row(s) to {}",
        result.summary.len() + usize::from(result.overall.is_some()),
        paths.summary.display()
    );

    Ok(())
}

/// A custom range file, else the named preset, else the demo preset.
fn load_range_table(
    file: Option<&Path>,
    preset: Option<&str>,
) -> Result<RangeTable, LabError> {
    match (file, preset) {
        (Some(path), _) => labflag_core::rules::load_ranges(path),
        (None, Some(name)) => builtin::load_preset(name),
        (None, None) => builtin::load_preset("demo"),
    }
}
