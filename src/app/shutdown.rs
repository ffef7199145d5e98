//! Graceful shutdown handling.

use log::{error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_handling::SinkError;
use crate::storage::{Bulk, StatementExecutor};

/// Stops the flush ticker and drains the buffer.
///
/// The ticker is cancelled and awaited first so no periodic flush can run
/// concurrently with the final one. If the ticker already ended with a
/// flush failure, that error is returned and nothing else is written.
pub async fn shutdown_gracefully<E: StatementExecutor>(
    cancel: CancellationToken,
    ticker: Option<JoinHandle<Result<(), SinkError>>>,
    bulk: &Bulk<E>,
) -> Result<(), SinkError> {
    // Signal the ticker to stop and await it
    cancel.cancel();
    if let Some(ticker) = ticker {
        match ticker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => error!("Flush ticker task ended abnormally: {}", e),
        }
    }

    let result = bulk.flush().await?;
    if result.skipped {
        info!("Shutdown during rebalance; final flush skipped");
    } else {
        info!(
            "Final flush wrote {} operation(s) in {} statement(s)",
            result.operations, result.statements
        );
    }
    Ok(())
}
