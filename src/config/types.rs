//! Configuration types.
//!
//! The connector is configured from a TOML file. Every section is optional
//! and falls back to the defaults in [`super::constants`]:
//!
//! ```toml
//! status_port = 9090
//!
//! [sql]
//! driver_name = "postgres"
//! host = "localhost"
//! port = 5432
//! user = "user"
//! password = "password"
//! db_name = "example"
//! ssl_mode = "disable"
//! batch_size_limit = 1000
//! batch_ticker_duration_secs = 10
//!
//! [[collection_table_mapping]]
//! collection = "airline"
//! table_name = "airlines"
//! key_column_name = "id"
//! value_column_name = "doc"
//!
//! [log]
//! level = "info"
//! format = "plain"
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error_handling::ConfigError;

use super::constants::{
    DEFAULT_BATCH_SIZE_LIMIT, DEFAULT_BATCH_TICKER_DURATION, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_SQLITE_PATH, MAX_BATCH_TICKER_DURATION, POSTGRES_MAX_BIND_PARAMETERS,
    SQLITE_MAX_BIND_PARAMETERS,
};

/// Plain unquoted SQL identifier.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Supported SQL drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SqlDriver {
    Sqlite,
    #[strum(to_string = "postgres", serialize = "postgresql")]
    Postgres,
}

/// `[sql]` section: store connection and batching.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlConfig {
    /// `sqlite` or `postgres`
    pub driver_name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub ssl_mode: String,
    /// SQLite database file (`:memory:` for an in-memory database)
    pub path: String,
    pub max_connections: u32,
    /// Buffered operation count that triggers a flush
    pub batch_size_limit: usize,
    /// Seconds between periodic flushes
    pub batch_ticker_duration_secs: u64,
}

impl Default for SqlConfig {
    fn default() -> Self {
        SqlConfig {
            driver_name: SqlDriver::Sqlite.to_string(),
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            db_name: String::new(),
            ssl_mode: "disable".to_string(),
            path: DEFAULT_SQLITE_PATH.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            batch_ticker_duration_secs: DEFAULT_BATCH_TICKER_DURATION.as_secs(),
        }
    }
}

impl SqlDriver {
    /// Most positional arguments one statement may bind.
    pub fn max_bind_parameters(self) -> usize {
        match self {
            SqlDriver::Sqlite => SQLITE_MAX_BIND_PARAMETERS,
            SqlDriver::Postgres => POSTGRES_MAX_BIND_PARAMETERS,
        }
    }
}

impl SqlConfig {
    /// Parses `driver_name`.
    pub fn driver(&self) -> Result<SqlDriver, ConfigError> {
        SqlDriver::from_str(self.driver_name.trim())
            .map_err(|_| ConfigError::UnsupportedDriver(self.driver_name.clone()))
    }

    pub fn batch_ticker_duration(&self) -> Duration {
        Duration::from_secs(self.batch_ticker_duration_secs)
    }

    /// Copy with the password masked, for logging.
    pub fn redacted(&self) -> SqlConfig {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "*****".to_string();
        }
        copy
    }
}

/// One `[[collection_table_mapping]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionTableMapping {
    pub collection: String,
    pub table_name: String,
    pub key_column_name: String,
    pub value_column_name: String,
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: LogLevel::Info,
            format: LogFormat::Plain,
        }
    }
}

/// Connector configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Port of the metrics/status server; disabled when unset
    pub status_port: Option<u16>,
    pub sql: SqlConfig,
    pub collection_table_mapping: Vec<CollectionTableMapping>,
    pub log: LogConfig,
}

impl ConnectorConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Checks value ranges and required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sql = &self.sql;
        if sql.batch_size_limit == 0 {
            return Err(invalid("sql.batch_size_limit", "must be greater than zero"));
        }
        if sql.batch_ticker_duration_secs == 0 {
            return Err(invalid(
                "sql.batch_ticker_duration_secs",
                "must be greater than zero",
            ));
        }
        if sql.batch_ticker_duration() > MAX_BATCH_TICKER_DURATION {
            return Err(invalid(
                "sql.batch_ticker_duration_secs",
                &format!("must be at most {}", MAX_BATCH_TICKER_DURATION.as_secs()),
            ));
        }
        if sql.max_connections == 0 {
            return Err(invalid("sql.max_connections", "must be greater than zero"));
        }

        match sql.driver()? {
            SqlDriver::Sqlite => {
                if sql.path.trim().is_empty() {
                    return Err(invalid("sql.path", "required for the sqlite driver"));
                }
            }
            SqlDriver::Postgres => {
                if sql.host.trim().is_empty() {
                    return Err(invalid("sql.host", "required for the postgres driver"));
                }
                if sql.db_name.trim().is_empty() {
                    return Err(invalid("sql.db_name", "required for the postgres driver"));
                }
            }
        }

        for mapping in &self.collection_table_mapping {
            let fields = [
                ("collection_table_mapping.collection", &mapping.collection),
                ("collection_table_mapping.table_name", &mapping.table_name),
                (
                    "collection_table_mapping.key_column_name",
                    &mapping.key_column_name,
                ),
                (
                    "collection_table_mapping.value_column_name",
                    &mapping.value_column_name,
                ),
            ];
            if let Some(&(field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
                return Err(invalid(field, "must not be empty"));
            }
            // Table and column names are written into statement text as-is
            if !mapping.table_name.split('.').all(|part| IDENTIFIER.is_match(part))
                || mapping.table_name.split('.').count() > 2
            {
                return Err(invalid(
                    "collection_table_mapping.table_name",
                    "must be an identifier, optionally schema-qualified",
                ));
            }
            if let Some(&(field, _)) = fields[2..]
                .iter()
                .find(|(_, v)| !IDENTIFIER.is_match(v.as_str()))
            {
                return Err(invalid(field, "must be an identifier"));
            }
        }

        Ok(())
    }
}

impl FromStr for ConnectorConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: ConnectorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
