use labflag_core::config::{load_options, PipelineOptions};
use labflag_core::error::LabError;
use std::path::Path;

use crate::output;
use crate::output::OutputFormat;

pub fn run(input_file: &Path, config: Option<&Path>, output_format: OutputFormat) -> Result<(), LabError> {
    let options = match config {
        Some(path) => load_options(path)?,
        None => PipelineOptions::default(),
    };

    let table = labflag_core::ingest::read_table(input_file)?;
    let report = labflag_core::map_header(&table, &options)?;

    match output_format {
        OutputFormat::Json => output::json::print(&report)?,
        OutputFormat::Table => output::table::print_mapping(&report),
    }

    Ok(())
}
