//! docindex CLI binary.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docindex::cli::{args::*, commands::*};

fn main() {
    // Parse command line arguments using clap
    let args = DocindexArgs::parse();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match args.verbosity() {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute the command
    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
