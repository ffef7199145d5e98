// storage/mod.rs
// SQL write path: buffering, compaction, execution

pub mod batch;
pub mod compact;
pub mod executor;
pub mod pool;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use batch::{start_flush_ticker, Bulk, BulkConfig, FlushResult, InsertOutcome};
pub use compact::{compact, CompactedStatement};
pub use executor::{SqlExecutor, StatementExecutor};
pub use pool::{connection_url, init_pool};
