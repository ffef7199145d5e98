//! Shared test helpers for storage module tests.
//!
//! This module provides an in-memory database and fake collaborators
//! (executors, acknowledgers, checkpoint callbacks) used across the
//! storage, connector and feed tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error_handling::ExecutionError;
use crate::feed::{Acknowledger, CheckpointCommit};

use super::compact::CompactedStatement;
use super::executor::StatementExecutor;

/// Creates an in-memory test database with the tables used by the tests.
///
/// Limited to one connection: every connection to `sqlite::memory:` opens
/// its own empty database.
pub async fn create_test_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    for ddl in [
        "CREATE TABLE example_table (id TEXT PRIMARY KEY NOT NULL, name TEXT)",
        "CREATE TABLE typed_values (i INTEGER, f REAL, b BOOLEAN, t TEXT)",
    ] {
        sqlx::query(ddl)
            .execute(&pool)
            .await
            .expect("Failed to create test table");
    }
    pool
}

/// Executor that records every statement and reports one affected row per
/// argument group.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    statements: Arc<Mutex<Vec<CompactedStatement>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements executed so far, in execution order.
    pub fn statements(&self) -> Vec<CompactedStatement> {
        self.statements.lock().expect("recorder lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.text).collect()
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

/// Executor that succeeds until `fail_at` statements have run, then rejects
/// every statement.
#[derive(Clone)]
pub struct FailingExecutor {
    fail_at: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingExecutor {
    /// Rejects every statement.
    pub fn always() -> Self {
        Self::after(0)
    }

    /// Accepts the first `fail_at` statements.
    pub fn after(fail_at: usize) -> Self {
        FailingExecutor {
            fail_at,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatementExecutor for FailingExecutor {
    async fn execute(&self, _statement: &CompactedStatement) -> Result<u64, ExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_at {
            return Err(ExecutionError::Rejected("store unavailable".to_string()));
        }
        Ok(1)
    }
}

/// Acknowledger that counts its calls.
#[derive(Default)]
pub struct CountingAck {
    count: AtomicUsize,
}

impl CountingAck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Acknowledger for CountingAck {
    fn acknowledge(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checkpoint callback plus a counter of its invocations.
pub fn checkpoint_counter() -> (CheckpointCommit, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let commit_counter = Arc::clone(&counter);
    let commit: CheckpointCommit = Arc::new(move || {
        commit_counter.fetch_add(1, Ordering::SeqCst);
    });
    (commit, counter)
}
