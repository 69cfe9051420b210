pub mod export;
pub mod json;
pub mod table;

/// How a command prints its result to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
