//! dcp_sql library: change-feed events to SQL, in compacted batches
//!
//! A [`Connector`] receives change events (mutations, expirations,
//! deletions) from a change-feed client, maps each one to SQL write
//! operations, buffers them, and periodically writes them to a relational
//! store. Single-row inserts sharing a table and column list are merged into
//! multi-row statements before execution. After every successful flush the
//! feed's checkpoint is committed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dcp_sql::{ChangeEvent, CheckpointCommit, ConnectorBuilder, ConnectorConfig};
//! # use dcp_sql::feed::Acknowledger;
//! # struct Ack;
//! # impl Acknowledger for Ack { fn acknowledge(&self) {} }
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config: ConnectorConfig = r#"
//!     [sql]
//!     driver_name = "sqlite"
//!     path = "./sink.db"
//!
//!     [[collection_table_mapping]]
//!     collection = "airline"
//!     table_name = "airline"
//!     key_column_name = "id"
//!     value_column_name = "body"
//! "#
//! .parse()?;
//!
//! let commit: CheckpointCommit = Arc::new(|| println!("checkpoint"));
//! let mut connector = ConnectorBuilder::new(config).build(commit).await?;
//! connector.start();
//!
//! let event = ChangeEvent::mutation("airline_10", r#"{"name":"40-Mile Air"}"#, "airline", chrono::Utc::now());
//! connector.listener(&event, &Ack).await?;
//!
//! connector.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

mod app;
pub mod config;
pub mod connector;
mod error_handling;
pub mod event;
pub mod feed;
pub mod initialization;
pub mod mapper;
pub mod metrics;
pub mod model;
mod run;
mod status_server;
pub mod storage;

// Re-export public API
pub use config::{ConnectorConfig, LogFormat, LogLevel, Opt, SqlConfig};
pub use connector::{Connector, ConnectorBuilder};
pub use error_handling::{ConfigError, ExecutionError, InitializationError, SinkError};
pub use event::{ChangeEvent, EventKind};
pub use feed::{Acknowledger, CheckpointCommit};
pub use mapper::{Mapper, TableMapper};
pub use metrics::{BulkMetric, MetricSnapshot};
pub use model::{Model, Operation, SqlValue};
pub use run::{run_connector, RunOptions, RunReport};
pub use status_server::{start_status_server, StatusState};
