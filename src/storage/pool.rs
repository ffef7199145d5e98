//! Database connection pool management.
//!
//! Builds a `sqlx` `AnyPool` from the `[sql]` configuration section:
//! - SQLite: creates the database file if missing and enables WAL mode
//! - PostgreSQL: connects with the configured host, credentials and SSL mode
//!
//! Any failure here is a configuration error, reported before the first
//! change event is processed.

use std::fs::OpenOptions;
use std::io::ErrorKind;

use log::{error, info};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use url::Url;

use crate::config::{SqlConfig, SqlDriver};
use crate::error_handling::ConfigError;

const SQLITE_MEMORY: &str = ":memory:";

/// Builds the `sqlx` connection URL for the configured driver.
pub fn connection_url(config: &SqlConfig) -> Result<String, ConfigError> {
    match config.driver()? {
        SqlDriver::Sqlite => Ok(format!("sqlite:{}", config.path)),
        SqlDriver::Postgres => {
            let mut url = Url::parse("postgres://localhost").map_err(|e| {
                ConfigError::InvalidValue {
                    field: "sql.host",
                    reason: e.to_string(),
                }
            })?;
            url.set_host(Some(&config.host))
                .map_err(|e| ConfigError::InvalidValue {
                    field: "sql.host",
                    reason: e.to_string(),
                })?;
            url.set_port(Some(config.port))
                .map_err(|_| ConfigError::InvalidValue {
                    field: "sql.port",
                    reason: "cannot be applied to this host".to_string(),
                })?;
            if !config.user.is_empty() {
                url.set_username(&config.user)
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "sql.user",
                        reason: "cannot be applied to this host".to_string(),
                    })?;
            }
            if !config.password.is_empty() {
                url.set_password(Some(&config.password))
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "sql.password",
                        reason: "cannot be applied to this host".to_string(),
                    })?;
            }
            url.set_path(&config.db_name);
            if !config.ssl_mode.is_empty() {
                url.query_pairs_mut()
                    .append_pair("sslmode", &config.ssl_mode);
            }
            Ok(url.to_string())
        }
    }
}

/// Initializes and returns a connection pool for the configured store.
pub async fn init_pool(config: &SqlConfig) -> Result<AnyPool, ConfigError> {
    sqlx::any::install_default_drivers();

    let driver = config.driver()?;
    let in_memory = driver == SqlDriver::Sqlite && config.path == SQLITE_MEMORY;

    if driver == SqlDriver::Sqlite && !in_memory {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&config.path)
        {
            Ok(_) => info!("Database file {} created.", config.path),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Database file {} already exists.", config.path)
            }
            Err(e) => {
                error!("Failed to create database file: {e}");
                return Err(ConfigError::IoError {
                    path: config.path.clone(),
                    source: e,
                });
            }
        }
    }

    // Every connection to an in-memory SQLite database sees its own database
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(&connection_url(config)?)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            ConfigError::ConnectionError(e)
        })?;

    if driver == SqlDriver::Sqlite && !in_memory {
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(|e| {
                error!("Failed to set WAL mode: {e}");
                ConfigError::ConnectionError(e)
            })?;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_url() {
        let config = SqlConfig {
            path: "./sink.db".to_string(),
            ..Default::default()
        };
        assert_eq!(connection_url(&config).expect("url"), "sqlite:./sink.db");
    }

    #[test]
    fn test_postgres_url_escapes_credentials() {
        let config = SqlConfig {
            driver_name: "postgres".to_string(),
            host: "db".to_string(),
            port: 5433,
            user: "user".to_string(),
            password: "p@ss".to_string(),
            db_name: "example".to_string(),
            ssl_mode: "disable".to_string(),
            ..Default::default()
        };
        assert_eq!(
            connection_url(&config).expect("url"),
            "postgres://user:p%40ss@db:5433/example?sslmode=disable"
        );
    }

    #[test]
    fn test_unknown_driver_has_no_url() {
        let config = SqlConfig {
            driver_name: "oracle".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            connection_url(&config),
            Err(ConfigError::UnsupportedDriver(_))
        ));
    }

    #[tokio::test]
    async fn test_init_pool_creates_sqlite_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sink.db");
        let config = SqlConfig {
            path: path.to_string_lossy().to_string(),
            ..Default::default()
        };

        let pool = init_pool(&config).await.expect("pool");
        assert!(path.exists());

        sqlx::query("CREATE TABLE t (a INTEGER)")
            .execute(&pool)
            .await
            .expect("create table");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_init_pool_in_memory() {
        let config = SqlConfig {
            path: SQLITE_MEMORY.to_string(),
            ..Default::default()
        };
        let pool = init_pool(&config).await.expect("pool");
        sqlx::query("CREATE TABLE t (a INTEGER)")
            .execute(&pool)
            .await
            .expect("create table");
        sqlx::query("INSERT INTO t (a) VALUES (1)")
            .execute(&pool)
            .await
            .expect("insert into same database");
    }
}
