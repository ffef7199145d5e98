//! Periodic flush ticker.

use std::sync::Arc;

use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error_handling::SinkError;
use crate::storage::executor::StatementExecutor;

use super::Bulk;

/// Spawns the task that flushes `bulk` every flush interval.
///
/// Every completed flush, including size-triggered ones from `insert`,
/// restarts the countdown. The task exits with `Ok(())` once `cancel` fires.
/// A failed flush cancels `cancel` and ends the task with the error.
pub fn start_flush_ticker<E: StatementExecutor>(
    bulk: Arc<Bulk<E>>,
    cancel: CancellationToken,
) -> JoinHandle<Result<(), SinkError>> {
    tokio::spawn(async move {
        let period = bulk.flush_interval();
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Flush ticker started ({:?} interval)", period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Flush ticker stopped");
                    return Ok(());
                }
                _ = bulk.flushed() => {
                    timer.reset();
                }
                _ = timer.tick() => {
                    if let Err(e) = bulk.flush().await {
                        error!("Periodic flush failed, stopping connector: {}", e);
                        cancel.cancel();
                        return Err(e);
                    }
                }
            }
        }
    })
}
