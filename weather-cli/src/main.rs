//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Running the one-shot ingestion job
//! - Serving the read-only query API

use std::{io::Write, process::ExitCode};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod server;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Write the failure diagnostic. Goes to stderr whatever the log filter says.
fn report_failure(err: &anyhow::Error, out: &mut impl Write) {
    let _ = writeln!(out, "error: {err:#}");
}

#[actix_web::main]
async fn main() -> ExitCode {
    init_tracing();

    let cmd = cli::Cli::parse();
    match cmd.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "Command failed");
            report_failure(&err, &mut std::io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}
