//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (batch defaults, log limits)
//! - TOML configuration types and validation
//! - CLI option parsing

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::Opt;
pub use constants::*;
pub use types::{
    CollectionTableMapping, ConnectorConfig, LogConfig, LogFormat, LogLevel, SqlConfig, SqlDriver,
};
