//! Connector assembly and event entry point.
//!
//! A [`Connector`] ties a mapper to a [`Bulk`] and its flush ticker. The
//! change-feed client calls [`Connector::listener`] once per event and
//! drives the rebalance hooks; the connector calls the checkpoint-commit
//! callback after every successful flush.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use dcp_sql::{ConnectorBuilder, CheckpointCommit};
//!
//! let commit: CheckpointCommit = Arc::new(|| {});
//! let mut connector = ConnectorBuilder::from_path("config.toml")?
//!     .build(commit)
//!     .await?;
//! connector.start();
//! // feed events through connector.listener(...)
//! connector.close().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::shutdown_gracefully;
use crate::config::ConnectorConfig;
use crate::error_handling::{ConfigError, SinkError};
use crate::event::ChangeEvent;
use crate::feed::{Acknowledger, CheckpointCommit};
use crate::mapper::{Mapper, TableMapper};
use crate::metrics::{BulkMetric, MetricSnapshot};
use crate::storage::{
    init_pool, start_flush_ticker, Bulk, BulkConfig, InsertOutcome, SqlExecutor,
    StatementExecutor,
};

/// Builds a [`Connector`] from configuration.
pub struct ConnectorBuilder {
    config: ConnectorConfig,
    mapper: Option<Arc<dyn Mapper>>,
}

impl ConnectorBuilder {
    pub fn new(config: ConnectorConfig) -> Self {
        ConnectorBuilder {
            config,
            mapper: None,
        }
    }

    /// Loads and validates a TOML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::new(ConnectorConfig::from_file(path)?))
    }

    /// Replaces the default [`TableMapper`].
    pub fn set_mapper<M: Mapper + 'static>(mut self, mapper: M) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Connects to the configured store and builds the connector.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid settings, an unknown driver or a
    /// store that cannot be reached.
    pub async fn build(
        self,
        checkpoint_commit: CheckpointCommit,
    ) -> Result<Connector<SqlExecutor>, ConfigError> {
        self.config.validate()?;
        match serde_json::to_string(&self.config.sql.redacted()) {
            Ok(printable) => info!("SQL config: {}", printable),
            Err(e) => warn!("Failed to render SQL config: {}", e),
        }
        let driver = self.config.sql.driver()?;
        let pool = init_pool(&self.config.sql).await?;
        self.build_with_executor(SqlExecutor::for_driver(pool, driver), checkpoint_commit)
    }

    /// Builds the connector around a caller-supplied executor.
    pub fn build_with_executor<E: StatementExecutor>(
        self,
        executor: E,
        checkpoint_commit: CheckpointCommit,
    ) -> Result<Connector<E>, ConfigError> {
        self.config.validate()?;
        let mapper: Arc<dyn Mapper> = match self.mapper {
            Some(mapper) => mapper,
            None => Arc::new(TableMapper::new(&self.config.collection_table_mapping)),
        };
        let bulk = Bulk::new(
            executor,
            BulkConfig::from(&self.config.sql),
            checkpoint_commit,
        );
        Ok(Connector {
            bulk: Arc::new(bulk),
            mapper,
            cancel: CancellationToken::new(),
            ticker: None,
            config: self.config,
        })
    }
}

/// Change-event sink writing to a SQL store in compacted batches.
pub struct Connector<E> {
    bulk: Arc<Bulk<E>>,
    mapper: Arc<dyn Mapper>,
    cancel: CancellationToken,
    ticker: Option<JoinHandle<Result<(), SinkError>>>,
    config: ConnectorConfig,
}

impl<E: StatementExecutor> Connector<E> {
    /// Starts the periodic flush ticker. Calling it again has no effect.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            warn!("Connector already started");
            return;
        }
        self.ticker = Some(start_flush_ticker(
            Arc::clone(&self.bulk),
            self.cancel.clone(),
        ));
        info!(
            "Connector started (batch size limit {}, flush every {:?})",
            self.bulk.batch_size_limit(),
            self.bulk.flush_interval()
        );
    }

    /// Handles one change event from the feed.
    ///
    /// Events the mapper turns into no operations are acknowledged at once.
    pub async fn listener(
        &self,
        event: &ChangeEvent,
        ack: &dyn Acknowledger,
    ) -> Result<InsertOutcome, SinkError> {
        let operations = self.mapper.map(event);
        if operations.is_empty() {
            ack.acknowledge();
            return Ok(InsertOutcome::Buffered);
        }
        self.bulk.insert(operations, ack, event.event_time).await
    }

    pub async fn pause_for_rebalance(&self) {
        self.bulk.pause_for_rebalance().await
    }

    pub async fn resume_after_rebalance(&self) {
        self.bulk.resume_after_rebalance().await
    }

    pub fn metrics(&self) -> MetricSnapshot {
        self.bulk.metric().snapshot()
    }

    /// Shared handle to the live gauges, for exporters.
    pub fn metric(&self) -> Arc<BulkMetric> {
        self.bulk.metric()
    }

    pub fn bulk(&self) -> &Bulk<E> {
        &self.bulk
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Resolves once the connector stops, either through [`Connector::close`]
    /// or because the flush ticker hit a fatal failure.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Stops the ticker and flushes whatever is still buffered.
    pub async fn close(mut self) -> Result<(), SinkError> {
        info!("Closing connector");
        let ticker = self.ticker.take();
        shutdown_gracefully(self.cancel.clone(), ticker, self.bulk.as_ref()).await
    }
}
