//! Status server data structures.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{BulkMetric, MetricReport};

/// Shared state for the status server
#[derive(Clone)]
pub struct StatusState {
    pub metric: Arc<BulkMetric>,
    pub start_time: Arc<Instant>,
}

impl StatusState {
    pub fn new(metric: Arc<BulkMetric>) -> Self {
        StatusState {
            metric,
            start_time: Arc::new(Instant::now()),
        }
    }
}

/// JSON response for `/status` endpoint
#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: f64,
    pub latency: MetricReport,
}
