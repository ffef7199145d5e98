//! Statement execution.
//!
//! The batch buffer hands every compacted statement to a
//! [`StatementExecutor`], one at a time and in compaction order.

use std::future::Future;

use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyPool};

use crate::config::{SqlDriver, SQLITE_MAX_BIND_PARAMETERS};
use crate::error_handling::ExecutionError;
use crate::model::SqlValue;

use super::compact::CompactedStatement;

/// Executes one statement with its positional arguments.
///
/// Returns the number of affected rows. Implementations must not retry: a
/// failure is reported as-is and the caller treats it as fatal.
pub trait StatementExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        statement: &CompactedStatement,
    ) -> impl Future<Output = Result<u64, ExecutionError>> + Send;

    /// Most positional arguments one statement may bind.
    fn max_bind_parameters(&self) -> usize {
        SQLITE_MAX_BIND_PARAMETERS
    }
}

/// Executes statements against a SQL database through a `sqlx` pool.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    pool: AnyPool,
    max_bind_parameters: usize,
}

impl SqlExecutor {
    /// Executor with the SQLite parameter limit, the lower of the supported drivers.
    pub fn new(pool: AnyPool) -> Self {
        Self::for_driver(pool, SqlDriver::Sqlite)
    }

    pub fn for_driver(pool: AnyPool, driver: SqlDriver) -> Self {
        SqlExecutor {
            pool,
            max_bind_parameters: driver.max_bind_parameters(),
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

impl StatementExecutor for SqlExecutor {
    async fn execute(&self, statement: &CompactedStatement) -> Result<u64, ExecutionError> {
        let mut query = sqlx::query(&statement.text);
        for value in statement.arguments() {
            query = bind_value(query, value);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    fn max_bind_parameters(&self) -> usize {
        self.max_bind_parameters
    }
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::create_test_pool;
    use sqlx::Row;

    fn statement(text: &str, groups: Vec<Vec<SqlValue>>) -> CompactedStatement {
        CompactedStatement {
            text: text.to_string(),
            argument_groups: groups,
        }
    }

    #[tokio::test]
    async fn test_executes_merged_insert_with_all_argument_groups() {
        let pool = create_test_pool().await;
        let executor = SqlExecutor::new(pool.clone());

        let affected = executor
            .execute(&statement(
                "INSERT INTO example_table (id, name) VALUES ($1, $2),($3, $4)",
                vec![
                    vec!["k1".into(), "n1".into()],
                    vec!["k2".into(), SqlValue::Null],
                ],
            ))
            .await
            .expect("insert succeeds");
        assert_eq!(affected, 2);

        let rows = sqlx::query("SELECT id, name FROM example_table ORDER BY id")
            .fetch_all(&pool)
            .await
            .expect("select");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String, _>(0), "k1");
        assert_eq!(rows[0].get::<Option<String>, _>(1), Some("n1".to_string()));
        assert_eq!(rows[1].get::<Option<String>, _>(1), None);
    }

    #[tokio::test]
    async fn test_binds_scalar_types() {
        let pool = create_test_pool().await;
        let executor = SqlExecutor::new(pool.clone());

        executor
            .execute(&statement(
                "INSERT INTO typed_values (i, f, b, t) VALUES ($1, $2, $3, $4)",
                vec![vec![
                    42i64.into(),
                    2.5f64.into(),
                    true.into(),
                    "text".into(),
                ]],
            ))
            .await
            .expect("insert succeeds");

        let row = sqlx::query("SELECT i, f, t FROM typed_values")
            .fetch_one(&pool)
            .await
            .expect("select");
        assert_eq!(row.get::<i64, _>(0), 42);
        assert_eq!(row.get::<f64, _>(1), 2.5);
        assert_eq!(row.get::<String, _>(2), "text");
    }

    #[tokio::test]
    async fn test_parameter_limit_follows_driver() {
        let pool = create_test_pool().await;
        assert_eq!(
            SqlExecutor::new(pool.clone()).max_bind_parameters(),
            SQLITE_MAX_BIND_PARAMETERS
        );
        assert_eq!(
            SqlExecutor::for_driver(pool, SqlDriver::Postgres).max_bind_parameters(),
            crate::config::POSTGRES_MAX_BIND_PARAMETERS
        );
    }

    #[tokio::test]
    async fn test_reports_sql_errors() {
        let pool = create_test_pool().await;
        let executor = SqlExecutor::new(pool);

        let err = executor
            .execute(&statement("INSERT INTO missing_table (a) VALUES (1)", vec![vec![]]))
            .await
            .expect_err("table does not exist");
        assert!(matches!(err, ExecutionError::SqlError(_)));
    }

    #[tokio::test]
    async fn test_update_reports_affected_rows() {
        let pool = create_test_pool().await;
        let executor = SqlExecutor::new(pool);

        executor
            .execute(&statement(
                "INSERT INTO example_table (id, name) VALUES ('a', 'x'),('b', 'x'),('c', 'y')",
                vec![vec![]],
            ))
            .await
            .expect("seed");
        let affected = executor
            .execute(&statement(
                "UPDATE example_table SET name = $1 WHERE name = $2",
                vec![vec!["z".into(), "x".into()]],
            ))
            .await
            .expect("update");
        assert_eq!(affected, 2);
    }
}
