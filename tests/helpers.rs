// Shared test helpers for integration tests.
//
// Fake collaborators and database setup used across multiple test files.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dcp_sql::storage::{CompactedStatement, StatementExecutor};
use dcp_sql::{
    Acknowledger, CheckpointCommit, ConnectorConfig, ExecutionError, SqlConfig,
};
use dcp_sql::config::CollectionTableMapping;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Opens (creating if needed) a file-backed SQLite database and creates the
/// `airline` table used by the tests.
#[allow(dead_code)] // Used by other test files
pub async fn create_airline_db(path: &Path) -> AnyPool {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .expect("Failed to open test database");
    sqlx::query("CREATE TABLE IF NOT EXISTS airline (id TEXT PRIMARY KEY NOT NULL, body TEXT)")
        .execute(&pool)
        .await
        .expect("Failed to create airline table");
    pool
}

/// Statement the default mapper renders for an `airline` mutation.
#[allow(dead_code)]
pub const AIRLINE_UPSERT: &str =
    "INSERT INTO airline (id, body) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET body = excluded.body";

/// Counts rows in `table`.
#[allow(dead_code)]
pub async fn count_rows(pool: &AnyPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Connector configuration writing the `airline` collection to the
/// `airline` table of the SQLite file at `path`.
#[allow(dead_code)]
pub fn airline_config(path: &Path, batch_size_limit: usize) -> ConnectorConfig {
    ConnectorConfig {
        sql: SqlConfig {
            path: path.display().to_string(),
            batch_size_limit,
            batch_ticker_duration_secs: 3600,
            ..Default::default()
        },
        collection_table_mapping: vec![CollectionTableMapping {
            collection: "airline".to_string(),
            table_name: "airline".to_string(),
            key_column_name: "id".to_string(),
            value_column_name: "body".to_string(),
        }],
        ..Default::default()
    }
}

/// Executor that records every statement it is given.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingExecutor {
    statements: Arc<Mutex<Vec<CompactedStatement>>>,
}

#[allow(dead_code)]
impl RecordingExecutor {
    pub fn texts(&self) -> Vec<String> {
        self.statements
            .lock()
            .expect("recorder lock")
            .iter()
            .map(|s| s.text.clone())
            .collect()
    }
}

impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, statement: &CompactedStatement) -> Result<u64, ExecutionError> {
        self.statements
            .lock()
            .expect("recorder lock")
            .push(statement.clone());
        Ok(statement.operation_count() as u64)
    }
}

/// Acknowledger that counts its calls.
#[derive(Default)]
#[allow(dead_code)]
pub struct CountingAck(AtomicUsize);

#[allow(dead_code)]
impl CountingAck {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Acknowledger for CountingAck {
    fn acknowledge(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checkpoint callback plus a counter of its invocations.
#[allow(dead_code)]
pub fn checkpoint_counter() -> (CheckpointCommit, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let commit_counter = Arc::clone(&counter);
    let commit: CheckpointCommit = Arc::new(move || {
        commit_counter.fetch_add(1, Ordering::SeqCst);
    });
    (commit, counter)
}
