//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `dcp_sql` library that handles:
//! - Command-line argument parsing
//! - Configuration loading
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use dcp_sql::initialization::init_logger_with;
use dcp_sql::{run_connector, ConnectorConfig, Opt, RunOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    let config = match ConnectorConfig::from_file(&opt.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dcp_sql error: {}", e);
            process::exit(2);
        }
    };

    // CLI flags take precedence over the [log] section
    let log_level = opt.log_level.clone().unwrap_or(config.log.level.clone());
    let log_format = opt.log_format.clone().unwrap_or(config.log.format.clone());
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let options = RunOptions {
        events: opt.events,
        checkpoint: opt.checkpoint,
        status_port: opt.status_port,
    };

    match run_connector(config, options).await {
        Ok(report) => {
            println!(
                "Replayed {} event{} ({} malformed, {} already committed) in {:.1}s, checkpoint at line {}",
                report.replay.events,
                if report.replay.events == 1 { "" } else { "s" },
                report.replay.malformed,
                report.replay.skipped,
                report.elapsed_seconds,
                report.committed_position
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("dcp_sql error: {:#}", e);
            process::exit(1);
        }
    }
}
