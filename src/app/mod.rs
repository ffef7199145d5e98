//! Application lifecycle helpers.
//!
//! Shutdown ordering shared by the connector and the binary.

pub mod shutdown;

// Re-export public API
pub use shutdown::shutdown_gracefully;
