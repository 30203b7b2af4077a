//! Command implementations for the docindex CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::IndexerConfig;
use crate::crawl::TreeCrawler;
use crate::index::OpenMode;
use crate::ingest::{InlineRecord, LineRecordIngestor, ParseErrorPolicy};
use crate::session::{IndexSession, SessionConfig, WriteAction};
use crate::storage::StorageConfig;

/// Execute a CLI command.
pub fn execute_command(args: DocindexArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => IndexerConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => IndexerConfig::default(),
    };

    match &args.command {
        Command::Files(files_args) => index_files(files_args, &config, &args),
        Command::Records(records_args) => index_records(records_args, &config, &args),
        Command::Inline(inline_args) => index_inline(inline_args, &config, &args),
    }
}

/// Session settings for an index directory given on the command line.
fn session_config(config: &IndexerConfig, index: &Path, create: bool) -> SessionConfig {
    let mut session = config.session.clone();
    session.storage = match &config.session.storage {
        StorageConfig::File(file) => {
            let mut file = file.clone();
            file.path = index.to_path_buf();
            StorageConfig::File(file)
        }
        StorageConfig::Memory(_) => StorageConfig::file(index),
    };
    if create {
        session.open_mode = OpenMode::Create;
    }
    session
}

fn index_files(args: &FilesArgs, config: &IndexerConfig, cli_args: &DocindexArgs) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let session_config = session_config(config, &args.index, args.create);
    let crawler = TreeCrawler::new(config.crawl.clone());

    if cli_args.verbosity() > 0 {
        println!("Indexing to directory '{}'...", args.index.display());
    }

    let (report, stats) = IndexSession::scoped(&session_config, |session| {
        let report = crawler.crawl(&args.root, session)?;
        anyhow::Ok((report, session.stats()))
    })
    .with_context(|| format!("indexing {}", args.root.display()))?;

    let failures = report
        .read_failures
        .iter()
        .chain(&report.write_failures)
        .map(FailureEntry::from)
        .collect();

    output_result(
        "Files indexed",
        &FilesResult {
            root: args.root.display().to_string(),
            index: args.index.display().to_string(),
            submitted: report.submitted,
            added: stats.added,
            replaced: stats.replaced,
            failures,
            cancelled: report.cancelled,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn index_records(
    args: &RecordsArgs,
    config: &IndexerConfig,
    cli_args: &DocindexArgs,
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let session_config = session_config(config, &args.index, args.create);

    let mut records = config.records.clone();
    if args.abort_on_parse_error {
        records.on_parse_error = ParseErrorPolicy::Abort;
    }
    let ingestor = LineRecordIngestor::new(records);

    let file = File::open(&args.file)
        .with_context(|| format!("opening record file {}", args.file.display()))?;

    let report = IndexSession::scoped(&session_config, |session| {
        anyhow::Ok(ingestor.ingest(BufReader::new(file), session)?)
    })
    .with_context(|| format!("indexing records from {}", args.file.display()))?;

    output_result(
        "Records indexed",
        &RecordsResult {
            file: args.file.display().to_string(),
            index: args.index.display().to_string(),
            submitted: report.submitted,
            blank_lines: report.blank_lines,
            parse_errors: report.parse_errors,
            write_errors: report.write_errors,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn index_inline(
    args: &InlineArgs,
    config: &IndexerConfig,
    cli_args: &DocindexArgs,
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let session_config = session_config(config, &args.index, args.create);

    let record = InlineRecord::from_file(&args.spec)
        .with_context(|| format!("reading inline record {}", args.spec.display()))?;
    let doc = record.to_document(&config.records)?;
    let fields = doc.len();

    let action = IndexSession::scoped(&session_config, |session| {
        anyhow::Ok(session.submit(doc, None)?)
    })
    .with_context(|| format!("indexing into {}", args.index.display()))?;

    let action = match action {
        WriteAction::Add => "add".to_string(),
        WriteAction::Replace { field, value } => format!("replace {field}={value}"),
    };

    output_result(
        "Record indexed",
        &InlineResult {
            index: args.index.display().to_string(),
            fields,
            action,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}
