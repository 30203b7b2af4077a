//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{DocindexArgs, OutputFormat};
use crate::crawl::FileFailure;

/// A file the crawl skipped.
#[derive(Debug, Serialize)]
pub struct FailureEntry {
    pub path: String,
    pub error: String,
}

impl From<&FileFailure> for FailureEntry {
    fn from(failure: &FileFailure) -> Self {
        FailureEntry {
            path: failure.path.display().to_string(),
            error: failure.error.to_string(),
        }
    }
}

/// Result of the `files` command.
#[derive(Debug, Serialize)]
pub struct FilesResult {
    pub root: String,
    pub index: String,
    pub submitted: usize,
    pub added: usize,
    pub replaced: usize,
    pub failures: Vec<FailureEntry>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Result of the `records` command.
#[derive(Debug, Serialize)]
pub struct RecordsResult {
    pub file: String,
    pub index: String,
    pub submitted: usize,
    pub blank_lines: usize,
    pub parse_errors: usize,
    pub write_errors: usize,
    pub duration_ms: u64,
}

/// Result of the `inline` command.
#[derive(Debug, Serialize)]
pub struct InlineResult {
    pub index: String,
    pub fields: usize,
    pub action: String,
    pub duration_ms: u64,
}

/// Print a command result in the requested format.
pub fn output_result<T: Serialize>(
    message: &str,
    result: &T,
    args: &DocindexArgs,
) -> anyhow::Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &DocindexArgs) -> anyhow::Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    if let Some(obj) = value.as_object() {
        for (key, val) in obj {
            match val {
                serde_json::Value::Array(items) => {
                    println!("{key}: {}", items.len());
                    for item in items {
                        if let (Some(path), Some(error)) = (
                            item.get("path").and_then(|p| p.as_str()),
                            item.get("error").and_then(|e| e.as_str()),
                        ) {
                            println!("  {path}: {error}");
                        }
                    }
                }
                serde_json::Value::String(s) => println!("{key}: {s}"),
                other => println!("{key}: {other}"),
            }
        }
    }
    Ok(())
}

fn output_json<T: Serialize>(result: &T, args: &DocindexArgs) -> anyhow::Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}
