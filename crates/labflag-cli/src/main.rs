mod commands;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "labflag",
    version,
    about = "Clean lab result exports, flag values outside reference ranges and summarize them"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, flag and summarize a lab results file (CSV, TSV or XLSX)
    Analyze {
        /// Path to the lab results file
        input_file: PathBuf,

        /// Custom JSON reference range file
        #[arg(short, long = "ranges", value_name = "FILE", conflicts_with = "preset")]
        ranges: Option<PathBuf>,

        /// Predefined range table (default: demo)
        #[arg(short, long = "preset", value_name = "NAME")]
        preset: Option<String>,

        /// Group-by fields for the summary, comma separated (default: test_code)
        #[arg(short, long = "by", value_name = "FIELD", value_delimiter = ',')]
        by: Vec<String>,

        /// JSON options file (group_by, date_formats, synonyms, drop_duplicates)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Where to write cleaned records (default: cleaned_<input>.csv)
        #[arg(long, value_name = "FILE")]
        out_clean: Option<PathBuf>,

        /// Where to write flagged records (default: flags_<input>.csv)
        #[arg(long, value_name = "FILE")]
        out_flags: Option<PathBuf>,

        /// Where to write the summary (default: summary_<input>.csv)
        #[arg(long, value_name = "FILE")]
        out_summary: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show how the columns of a file map onto canonical fields
    Columns {
        /// Path to the lab results file
        input_file: PathBuf,

        /// JSON options file with extra column synonyms
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Inspect and validate reference range tables
    Ranges {
        #[command(subcommand)]
        action: RangesAction,
    },
}

#[derive(Subcommand)]
enum RangesAction {
    /// List predefined range tables
    List,
    /// Show every range of a predefined table
    Explain {
        /// Preset name (e.g., "demo")
        preset: String,
    },
    /// Print the JSON range file format with an example
    Schema,
    /// Validate a custom range file
    Validate {
        /// Path to JSON range file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&logging::LogConfig::from_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Analyze {
            input_file,
            ranges,
            preset,
            by,
            config,
            out_clean,
            out_flags,
            out_summary,
            output,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            input_file,
            ranges,
            preset,
            group_by: by,
            config,
            out_clean,
            out_flags,
            out_summary,
            output_format: output,
        }),
        Commands::Columns {
            input_file,
            config,
            output,
        } => commands::columns::run(&input_file, config.as_deref(), output),
        Commands::Ranges { action } => match action {
            RangesAction::List => commands::ranges::list(),
            RangesAction::Explain { preset } => commands::ranges::explain(&preset),
            RangesAction::Schema => commands::ranges::schema(),
            RangesAction::Validate { file } => commands::ranges::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
