//! Batch buffer data structures.

use std::time::Duration;

use crate::config::{SqlConfig, DEFAULT_BATCH_SIZE_LIMIT, DEFAULT_BATCH_TICKER_DURATION};
use crate::model::Operation;

/// Flush thresholds for a [`super::Bulk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkConfig {
    /// Buffered operation count that triggers a flush from `insert`
    pub batch_size_limit: usize,
    /// Period of the flush ticker
    pub flush_interval: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        BulkConfig {
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            flush_interval: DEFAULT_BATCH_TICKER_DURATION,
        }
    }
}

impl From<&SqlConfig> for BulkConfig {
    fn from(config: &SqlConfig) -> Self {
        BulkConfig {
            batch_size_limit: config.batch_size_limit,
            flush_interval: config.batch_ticker_duration(),
        }
    }
}

/// State guarded by the bulk lock.
#[derive(Debug, Default)]
pub(crate) struct BulkState {
    pub(crate) batch: Vec<Operation>,
    pub(crate) is_rebalancing: bool,
    pub(crate) poisoned: bool,
}

/// What happened to the operations handed to `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Buffered and acknowledged; below the size threshold.
    Buffered,
    /// Buffered and acknowledged, and the insert reached the size threshold.
    Flushed(FlushResult),
    /// Refused during a rebalance; the event was not acknowledged.
    Rejected,
}

/// Summary of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushResult {
    /// Buffered operations written
    pub operations: usize,
    /// Statements executed after compaction
    pub statements: usize,
    /// Rows reported by the store across all statements
    pub rows_affected: u64,
    /// True when the flush was skipped because a rebalance is in progress
    pub skipped: bool,
}

impl FlushResult {
    pub fn skipped() -> Self {
        FlushResult {
            skipped: true,
            ..Default::default()
        }
    }
}
