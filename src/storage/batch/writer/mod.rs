//! Bulk writer implementation.
//!
//! This module provides the [`Bulk`] struct and its methods for buffering
//! operations and guarding the buffer across rebalances. Flushing lives in
//! `flush.rs`.

mod flush;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::{Mutex, Notify};

use crate::error_handling::SinkError;
use crate::feed::{Acknowledger, CheckpointCommit};
use crate::metrics::BulkMetric;
use crate::model::Operation;
use crate::storage::executor::StatementExecutor;

use super::types::{BulkConfig, BulkState, InsertOutcome};

/// Operation buffer shared by the event listener and the flush ticker.
///
/// The batch and the rebalancing flag sit behind one lock; inserts, flushes
/// and rebalance transitions serialize through it.
pub struct Bulk<E> {
    executor: E,
    state: Mutex<BulkState>,
    checkpoint_commit: CheckpointCommit,
    config: BulkConfig,
    metric: Arc<BulkMetric>,
    ticker_reset: Notify,
}

impl<E: StatementExecutor> Bulk<E> {
    pub fn new(executor: E, config: BulkConfig, checkpoint_commit: CheckpointCommit) -> Self {
        Bulk {
            executor,
            state: Mutex::new(BulkState::default()),
            checkpoint_commit,
            config,
            metric: Arc::new(BulkMetric::new()),
            ticker_reset: Notify::new(),
        }
    }

    /// Appends `operations` to the buffer and acknowledges the event.
    ///
    /// Flushes before returning when the buffer reaches the size limit. The
    /// size check is taken under the lock but the flush re-acquires it, so
    /// a concurrent flush or rebalance in between is re-validated there.
    ///
    /// During a rebalance nothing is buffered and `ack` is left untouched so
    /// the feed redelivers the event.
    pub async fn insert(
        &self,
        operations: Vec<Operation>,
        ack: &dyn Acknowledger,
        event_time: DateTime<Utc>,
    ) -> Result<InsertOutcome, SinkError> {
        let should_flush = {
            let mut state = self.state.lock().await;
            if state.poisoned {
                return Err(SinkError::Poisoned);
            }
            if state.is_rebalancing {
                warn!(
                    "Rejecting {} operation(s) while rebalancing; event left unacknowledged",
                    operations.len()
                );
                return Ok(InsertOutcome::Rejected);
            }

            state.batch.extend(operations);
            ack.acknowledge();
            self.metric.record_process_latency(event_time);

            state.batch.len() >= self.config.batch_size_limit
        };

        if should_flush {
            let result = self.flush().await?;
            return Ok(InsertOutcome::Flushed(result));
        }
        Ok(InsertOutcome::Buffered)
    }

    /// Enters a rebalance: discards the buffer and rejects inserts until
    /// [`Bulk::resume_after_rebalance`].
    pub async fn pause_for_rebalance(&self) {
        let mut state = self.state.lock().await;
        let discarded = state.batch.len();
        state.is_rebalancing = true;
        state.batch.clear();
        debug!("Rebalance started; discarded {} buffered operation(s)", discarded);
    }

    pub async fn resume_after_rebalance(&self) {
        let mut state = self.state.lock().await;
        state.is_rebalancing = false;
        debug!("Rebalance finished; accepting operations");
    }

    /// Number of buffered operations.
    pub async fn len(&self) -> usize {
        self.state.lock().await.batch.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.batch.is_empty()
    }

    pub async fn is_rebalancing(&self) -> bool {
        self.state.lock().await.is_rebalancing
    }

    /// True once a flush has failed.
    pub async fn is_poisoned(&self) -> bool {
        self.state.lock().await.poisoned
    }

    pub fn metric(&self) -> Arc<BulkMetric> {
        Arc::clone(&self.metric)
    }

    pub fn batch_size_limit(&self) -> usize {
        self.config.batch_size_limit
    }

    pub fn flush_interval(&self) -> Duration {
        self.config.flush_interval
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Resolves after the next completed flush.
    pub(crate) async fn flushed(&self) {
        self.ticker_reset.notified().await
    }
}
