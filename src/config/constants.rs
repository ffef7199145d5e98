//! Configuration constants.
//!
//! Defaults applied when the configuration file leaves a value unset.

use std::time::Duration;

/// Number of buffered operations that triggers a size-based flush.
pub const DEFAULT_BATCH_SIZE_LIMIT: usize = 1000;

/// Interval of the periodic flush ticker.
pub const DEFAULT_BATCH_TICKER_DURATION: Duration = Duration::from_secs(10);

/// Database connection pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite database file used when no path is configured.
pub const DEFAULT_SQLITE_PATH: &str = "./dcp_sql.db";

/// Collection name used when an event does not carry one.
pub const DEFAULT_COLLECTION: &str = "_default";

/// Maximum statement length kept in error messages and logs.
/// Merged inserts can be very long; anything past this is cut with a note of the full length.
pub const MAX_LOGGED_STATEMENT_CHARS: usize = 200;

/// Longest accepted `batch_ticker_duration_secs` (one day).
pub const MAX_BATCH_TICKER_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Bind parameters SQLite accepts in one statement (`SQLITE_MAX_VARIABLE_NUMBER`).
pub const SQLITE_MAX_BIND_PARAMETERS: usize = 32_766;

/// Bind parameters PostgreSQL accepts in one statement.
pub const POSTGRES_MAX_BIND_PARAMETERS: usize = 65_535;
