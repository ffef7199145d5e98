//! Error type definitions.
//!
//! This module defines the error types used throughout the connector,
//! from startup configuration through statement execution.

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors raised while loading, validating or applying the connector configuration.
///
/// All of these are fatal at startup: they surface before any change event
/// is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configured SQL driver is not supported.
    #[error("unsupported sql driver '{0}' (expected one of: sqlite, postgres)")]
    UnsupportedDriver(String),

    /// A configuration value is out of range or missing.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The store could not be reached with the configured connection parameters.
    #[error("failed to connect to sql store: {0}")]
    ConnectionError(#[source] sqlx::Error),
}

/// Failure reported by a statement executor for a single statement.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// The store refused the statement for a reason outside of the SQL driver.
    #[error("statement rejected: {0}")]
    Rejected(String),
}

/// Errors returned by the batch buffer.
///
/// Both variants are fatal for the connector: a failed flush leaves the
/// buffered operations in place, never commits the checkpoint, and poisons
/// the buffer so no further work is accepted.
#[derive(Error, Debug)]
pub enum SinkError {
    /// A compacted statement failed during a flush.
    #[error("flush failed on statement {index} of {total} ({statement}): {source}")]
    Execution {
        /// Zero-based position of the failed statement in compaction order
        index: usize,
        /// Number of compacted statements in the flush
        total: usize,
        /// Statement text, truncated for logging
        statement: String,
        /// Underlying executor failure
        #[source]
        source: ExecutionError,
    },

    /// A previous flush failed; the buffer no longer accepts work.
    #[error("batch buffer is poisoned by an earlier flush failure")]
    Poisoned,
}
