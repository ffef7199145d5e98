//! Connector latency gauges.
//!
//! Two last-value gauges, overwritten on every sample:
//! - process latency: from the event's origin time to the point its
//!   operations are buffered and acknowledged
//! - bulk request process latency: wall time spent executing one flush's
//!   statements against the store

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latest latency samples, stored in microseconds.
#[derive(Debug, Default)]
pub struct BulkMetric {
    process_latency_us: AtomicU64,
    bulk_request_process_latency_us: AtomicU64,
}

/// Point-in-time copy of [`BulkMetric`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub process_latency: Duration,
    pub bulk_request_process_latency: Duration,
}

/// JSON form of a snapshot, in milliseconds.
#[derive(Debug, Serialize)]
pub struct MetricReport {
    pub process_latency_ms: u64,
    pub bulk_request_process_latency_ms: u64,
}

impl BulkMetric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latency between `event_time` and now.
    ///
    /// Event times ahead of the local clock record zero.
    pub fn record_process_latency(&self, event_time: DateTime<Utc>) {
        let latency = (Utc::now() - event_time).to_std().unwrap_or_default();
        self.process_latency_us
            .store(as_micros(latency), Ordering::SeqCst);
    }

    pub fn record_bulk_request_process_latency(&self, elapsed: Duration) {
        self.bulk_request_process_latency_us
            .store(as_micros(elapsed), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            process_latency: Duration::from_micros(
                self.process_latency_us.load(Ordering::SeqCst),
            ),
            bulk_request_process_latency: Duration::from_micros(
                self.bulk_request_process_latency_us.load(Ordering::SeqCst),
            ),
        }
    }
}

impl MetricSnapshot {
    pub fn report(&self) -> MetricReport {
        MetricReport {
            process_latency_ms: as_millis(self.process_latency),
            bulk_request_process_latency_ms: as_millis(self.bulk_request_process_latency),
        }
    }
}

fn as_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Renders a snapshot in the Prometheus text exposition format.
pub fn render_prometheus(snapshot: &MetricSnapshot) -> String {
    let report = snapshot.report();
    format!(
        r#"# HELP dcp_sql_connector_latency_ms_current SQL connector latency ms
# TYPE dcp_sql_connector_latency_ms_current gauge
dcp_sql_connector_latency_ms_current {}

# HELP dcp_sql_connector_bulk_request_process_latency_ms_current SQL connector bulk request process latency ms
# TYPE dcp_sql_connector_bulk_request_process_latency_ms_current gauge
dcp_sql_connector_bulk_request_process_latency_ms_current {}
"#,
        report.process_latency_ms, report.bulk_request_process_latency_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metric_is_zero() {
        assert_eq!(BulkMetric::new().snapshot(), MetricSnapshot::default());
    }

    #[test]
    fn test_process_latency_is_last_value() {
        let metric = BulkMetric::new();
        metric.record_process_latency(Utc::now() - chrono::Duration::seconds(30));
        let first = metric.snapshot().process_latency;
        assert!(first >= Duration::from_secs(30));

        metric.record_process_latency(Utc::now() - chrono::Duration::seconds(1));
        let second = metric.snapshot().process_latency;
        assert!(second >= Duration::from_secs(1));
        assert!(second < first);
    }

    #[test]
    fn test_future_event_time_records_zero() {
        let metric = BulkMetric::new();
        metric.record_process_latency(Utc::now() + chrono::Duration::seconds(60));
        assert_eq!(metric.snapshot().process_latency, Duration::ZERO);
    }

    #[test]
    fn test_bulk_latency_is_overwritten() {
        let metric = BulkMetric::new();
        metric.record_bulk_request_process_latency(Duration::from_millis(250));
        metric.record_bulk_request_process_latency(Duration::from_millis(40));
        assert_eq!(
            metric.snapshot().bulk_request_process_latency,
            Duration::from_millis(40)
        );
    }

    #[test]
    fn test_render_prometheus() {
        let snapshot = MetricSnapshot {
            process_latency: Duration::from_millis(1500),
            bulk_request_process_latency: Duration::from_micros(12_900),
        };
        let text = render_prometheus(&snapshot);
        assert!(text.contains("# TYPE dcp_sql_connector_latency_ms_current gauge"));
        assert!(text.contains("\ndcp_sql_connector_latency_ms_current 1500\n"));
        assert!(text.contains("\ndcp_sql_connector_bulk_request_process_latency_ms_current 12\n"));
    }
}
