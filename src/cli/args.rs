//! Command line argument parsing for the docindex CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// docindex - index files and structured records into a persistent store
#[derive(Parser, Debug, Clone)]
#[command(name = "docindex")]
#[command(about = "Index files and structured records into a persistent document store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct DocindexArgs {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "DOCINDEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl DocindexArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Index every file under a directory
    Files(FilesArgs),

    /// Index a JSON-lines record file
    Records(RecordsArgs),

    /// Index one inline record specification
    Inline(InlineArgs),
}

/// Arguments for crawling a directory
#[derive(Parser, Debug, Clone)]
pub struct FilesArgs {
    /// Directory (or single file) to index
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Path to the index directory
    #[arg(short, long, value_name = "INDEX_PATH", default_value = "index")]
    pub index: PathBuf,

    /// Discard existing index content first
    #[arg(long)]
    pub create: bool,
}

/// Arguments for indexing a record file
#[derive(Parser, Debug, Clone)]
pub struct RecordsArgs {
    /// JSON-lines file, one record per line
    #[arg(value_name = "RECORD_FILE")]
    pub file: PathBuf,

    /// Path to the index directory
    #[arg(short, long, value_name = "INDEX_PATH", default_value = "index")]
    pub index: PathBuf,

    /// Discard existing index content first
    #[arg(long)]
    pub create: bool,

    /// Stop at the first line that is not a valid record
    #[arg(long)]
    pub abort_on_parse_error: bool,
}

/// Arguments for indexing an inline record
#[derive(Parser, Debug, Clone)]
pub struct InlineArgs {
    /// Inline record specification (JSON)
    #[arg(value_name = "SPEC_FILE")]
    pub spec: PathBuf,

    /// Path to the index directory
    #[arg(short, long, value_name = "INDEX_PATH", default_value = "DataIndex")]
    pub index: PathBuf,

    /// Discard existing index content first
    #[arg(long)]
    pub create: bool,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
