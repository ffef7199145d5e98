//! Error handling.
//!
//! Error types are grouped by the phase in which they occur:
//! - **Initialization**: logger setup
//! - **Configuration**: file loading, validation and store connection (fatal at startup)
//! - **Execution**: a single statement rejected by the store
//! - **Sink**: a flush failure, fatal for the connector

mod types;

// Re-export public API
pub use types::{ConfigError, ExecutionError, InitializationError, SinkError};
