//! Command-line run: replay a JSON-lines feed through a connector.
//!
//! This module wires the pieces the binary needs:
//! 1. Open the feed position (resuming from the checkpoint file)
//! 2. Build and start the connector
//! 3. Start the status server when a port is configured
//! 4. Replay events until the input ends or the connector fails
//! 5. Close the connector, flushing whatever is still buffered

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use tokio::io::BufReader;

use crate::config::ConnectorConfig;
use crate::connector::{Connector, ConnectorBuilder};
use crate::feed::jsonl::{FeedPosition, JsonLinesFeed, ReplaySummary};
use crate::status_server::{start_status_server, StatusState};
use crate::storage::StatementExecutor;

/// Inputs of one command-line run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// JSON-lines event file, `-` for stdin
    pub events: PathBuf,
    /// Checkpoint file for the committed feed position
    pub checkpoint: Option<PathBuf>,
    /// Status server port; falls back to `status_port` from the configuration
    pub status_port: Option<u16>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub replay: ReplaySummary,
    /// Feed line the checkpoint was last committed at
    pub committed_position: u64,
    pub elapsed_seconds: f64,
}

/// Replays the configured event source into the configured store.
///
/// # Errors
///
/// Returns an error if the connector cannot be built, the input cannot be
/// read, or a flush fails. A failed flush never commits the checkpoint, so a
/// rerun with the same checkpoint file resumes from the last good position.
pub async fn run_connector(config: ConnectorConfig, options: RunOptions) -> Result<RunReport> {
    let start = Instant::now();

    let feed = JsonLinesFeed::new(FeedPosition::open(options.checkpoint.clone())?);
    let status_port = options.status_port.or(config.status_port);

    let mut connector = ConnectorBuilder::new(config)
        .build(feed.checkpoint_commit())
        .await
        .context("Failed to build connector")?;
    connector.start();

    let status_task = status_port.map(|port| {
        let state = StatusState::new(connector.metric());
        tokio::spawn(async move {
            if let Err(e) = start_status_server(port, state).await {
                warn!("{:#}", e);
            }
        })
    });

    let replayed = tokio::select! {
        result = replay_events(&feed, &options.events, &connector) => result,
        _ = connector.cancelled() => Err(anyhow!("Connector stopped after a failed flush")),
    };

    let closed = connector.close().await;
    if let Some(task) = status_task {
        task.abort();
    }

    let replay = match (replayed, closed) {
        (Ok(summary), Ok(())) => summary,
        (Ok(_), Err(e)) => return Err(e).context("Failed to flush remaining operations"),
        (Err(e), closed) => {
            if let Err(close_error) = closed {
                error!("Connector close after failed replay: {}", close_error);
            }
            return Err(e);
        }
    };

    let report = RunReport {
        replay,
        committed_position: feed.position().committed(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        "Replay finished: {} event(s), {} malformed, {} skipped; checkpoint at line {}",
        report.replay.events,
        report.replay.malformed,
        report.replay.skipped,
        report.committed_position
    );
    Ok(report)
}

async fn replay_events<E: StatementExecutor>(
    feed: &JsonLinesFeed,
    path: &Path,
    connector: &Connector<E>,
) -> Result<ReplaySummary> {
    if path == Path::new("-") {
        info!("Reading change events from stdin");
        return feed
            .replay(BufReader::new(tokio::io::stdin()), connector)
            .await;
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open events file {}", path.display()))?;
    info!("Reading change events from {}", path.display());
    feed.replay(BufReader::new(file), connector).await
}
