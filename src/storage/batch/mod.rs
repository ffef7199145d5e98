//! Batch buffer.
//!
//! A [`Bulk`] buffers the operations produced for each change event and
//! writes them to the store in compacted batches. A batch is flushed when:
//! - an insert brings the buffer to the size limit
//! - the flush ticker fires (even with an empty buffer, so checkpoints
//!   keep advancing on idle streams)
//! - the connector shuts down

mod ticker;
mod types;
mod writer;

pub use ticker::start_flush_ticker;
pub use types::{BulkConfig, FlushResult, InsertOutcome};
pub use writer::Bulk;
