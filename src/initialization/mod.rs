//! Application initialization.
//!
//! Logger setup lives here; the database pool is initialized by
//! [`crate::storage::init_pool`] so it can report configuration errors.

mod logger;

// Re-export public API
pub use logger::init_logger_with;
