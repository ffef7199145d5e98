//! Change-feed boundary.
//!
//! The connector does not own the change feed. It receives one
//! [`Acknowledger`] per event and a [`CheckpointCommit`] callback, and is told
//! about rebalances through `pause_for_rebalance` / `resume_after_rebalance`.
//!
//! [`jsonl`] provides a file-backed feed used by the command-line binary.

pub mod jsonl;

use std::sync::Arc;

/// Per-event acknowledgement handle.
///
/// Acknowledging tells the feed the event is safely captured and its position
/// may be checkpointed. Implementations must tolerate repeated calls.
pub trait Acknowledger: Send + Sync {
    fn acknowledge(&self);
}

/// Persists the feed position. Invoked after every successful flush.
pub type CheckpointCommit = Arc<dyn Fn() + Send + Sync>;
