//! Batch flushing logic.

use std::time::Instant;

use log::{debug, error};

use crate::config::MAX_LOGGED_STATEMENT_CHARS;
use crate::error_handling::SinkError;
use crate::storage::compact::compact;
use crate::storage::executor::StatementExecutor;

use super::Bulk;
use crate::storage::batch::types::FlushResult;

impl<E: StatementExecutor> Bulk<E> {
    /// Writes every buffered operation to the store.
    ///
    /// The batch is compacted and each statement executed in order under
    /// the bulk lock. On success the buffer is cleared, the ticker countdown
    /// restarts and the checkpoint is committed. An empty buffer still
    /// commits, so idle streams keep advancing their checkpoint.
    ///
    /// While rebalancing this is a no-op returning [`FlushResult::skipped`].
    ///
    /// A failed statement is fatal: the buffer is kept, the checkpoint is
    /// not committed, and the bulk is poisoned so every later call returns
    /// [`SinkError::Poisoned`]. Statements that already ran are not rolled
    /// back.
    pub async fn flush(&self) -> Result<FlushResult, SinkError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(SinkError::Poisoned);
        }
        if state.is_rebalancing {
            debug!("Skipping flush while rebalancing");
            return Ok(FlushResult::skipped());
        }

        let operations = state.batch.len();
        let statements = compact(&state.batch, self.executor.max_bind_parameters());
        let total = statements.len();
        if operations > 0 {
            debug!(
                "Flushing {} operation(s) as {} statement(s)",
                operations, total
            );
        }

        let start = Instant::now();
        let mut rows_affected = 0u64;
        for (index, statement) in statements.iter().enumerate() {
            match self.executor.execute(statement).await {
                Ok(rows) => {
                    debug!("Statement {}/{} affected {} row(s)", index + 1, total, rows);
                    rows_affected += rows;
                }
                Err(source) => {
                    state.poisoned = true;
                    let statement = truncate_statement(&statement.text);
                    error!(
                        "Flush failed on statement {}/{} ({}): {}",
                        index + 1,
                        total,
                        statement,
                        source
                    );
                    return Err(SinkError::Execution {
                        index,
                        total,
                        statement,
                        source,
                    });
                }
            }
        }
        self.metric
            .record_bulk_request_process_latency(start.elapsed());

        state.batch.clear();
        self.ticker_reset.notify_one();
        (self.checkpoint_commit)();

        Ok(FlushResult {
            operations,
            statements: total,
            rows_affected,
            skipped: false,
        })
    }
}

fn truncate_statement(text: &str) -> String {
    let length = text.chars().count();
    if length <= MAX_LOGGED_STATEMENT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_LOGGED_STATEMENT_CHARS).collect();
    format!("{}... ({} chars)", head, length)
}
