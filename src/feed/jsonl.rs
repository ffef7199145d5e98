//! JSON-lines change feed.
//!
//! Replays change events from a file or stdin, one JSON object per line:
//!
//! ```text
//! {"type":"mutation","key":"airline_10","value":{"name":"40-Mile Air"},"collection":"airline"}
//! {"type":"deletion","key":"airline_10","collection":"airline","event_time":"2024-05-01T10:00:00Z"}
//! ```
//!
//! The feed position is the number of acknowledged lines. A checkpoint commit
//! persists it to the checkpoint file (when configured) and a later replay
//! skips every line up to the committed position.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::DEFAULT_COLLECTION;
use crate::connector::Connector;
use crate::event::{ChangeEvent, EventKind};
use crate::storage::StatementExecutor;

use super::{Acknowledger, CheckpointCommit};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordKind {
    Mutation,
    Expiration,
    Deletion,
}

#[derive(Debug, Deserialize)]
struct FeedRecord {
    #[serde(rename = "type")]
    kind: RecordKind,
    key: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(default = "Utc::now")]
    event_time: DateTime<Utc>,
    #[serde(default)]
    cas: u64,
    #[serde(default)]
    vb_id: u16,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl From<FeedRecord> for ChangeEvent {
    fn from(record: FeedRecord) -> Self {
        let kind = match record.kind {
            RecordKind::Mutation => EventKind::Mutation,
            RecordKind::Expiration => EventKind::Expiration,
            RecordKind::Deletion => EventKind::Deletion,
        };
        // String bodies are stored verbatim, anything else as compact JSON
        let value = match (kind, record.value) {
            (EventKind::Mutation, Some(serde_json::Value::String(s))) => Some(s.into_bytes()),
            (EventKind::Mutation, Some(v)) => Some(v.to_string().into_bytes()),
            (EventKind::Mutation, None) => Some(Vec::new()),
            _ => None,
        };
        ChangeEvent {
            kind,
            key: record.key.into_bytes(),
            value,
            collection_name: record.collection,
            event_time: record.event_time,
            cas: record.cas,
            vb_id: record.vb_id,
        }
    }
}

/// Parses one feed line into a change event.
pub fn parse_line(line: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str::<FeedRecord>(line).map(ChangeEvent::from)
}

/// Acknowledged and committed position of a JSON-lines feed.
#[derive(Debug)]
pub struct FeedPosition {
    acknowledged: AtomicU64,
    committed: AtomicU64,
    checkpoint_path: Option<PathBuf>,
}

impl FeedPosition {
    /// Opens the position, resuming from the checkpoint file if it exists.
    pub fn open(checkpoint_path: Option<PathBuf>) -> Result<Self> {
        let committed = match &checkpoint_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read checkpoint file {}", path.display())
                })?;
                contents.trim().parse::<u64>().with_context(|| {
                    format!("Checkpoint file {} is not a line count", path.display())
                })?
            }
            _ => 0,
        };
        if committed > 0 {
            info!("Resuming feed after line {}", committed);
        }
        Ok(FeedPosition {
            acknowledged: AtomicU64::new(committed),
            committed: AtomicU64::new(committed),
            checkpoint_path,
        })
    }

    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    fn acknowledge_line(&self, line: u64) {
        self.acknowledged.fetch_max(line, Ordering::SeqCst);
    }

    /// Advances the committed position to everything acknowledged so far.
    ///
    /// The position only moves once the checkpoint file is written; a failed
    /// write leaves it where it was so the next commit tries again.
    pub fn commit(&self) {
        let position = self.acknowledged();
        if position == self.committed() {
            return;
        }
        if let Some(path) = &self.checkpoint_path {
            if let Err(e) = std::fs::write(path, position.to_string()) {
                error!(
                    "Failed to persist checkpoint {} to {}: {}",
                    position,
                    path.display(),
                    e
                );
                return;
            }
        }
        self.committed.fetch_max(position, Ordering::SeqCst);
        debug!("Checkpoint committed at line {}", position);
    }
}

/// Acknowledgement handle for one feed line.
pub struct LineAck {
    line: u64,
    position: Arc<FeedPosition>,
}

impl Acknowledger for LineAck {
    fn acknowledge(&self) {
        self.position.acknowledge_line(self.line);
    }
}

/// Counters for one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines skipped because they were committed by an earlier run
    pub skipped: u64,
    /// Lines turned into change events and handed to the connector
    pub events: u64,
    /// Lines that could not be parsed
    pub malformed: u64,
}

/// File-backed change feed.
pub struct JsonLinesFeed {
    position: Arc<FeedPosition>,
}

impl JsonLinesFeed {
    pub fn new(position: FeedPosition) -> Self {
        JsonLinesFeed {
            position: Arc::new(position),
        }
    }

    pub fn position(&self) -> &FeedPosition {
        &self.position
    }

    /// Checkpoint-commit callback bound to this feed's position.
    pub fn checkpoint_commit(&self) -> CheckpointCommit {
        let position = Arc::clone(&self.position);
        Arc::new(move || position.commit())
    }

    /// Feeds every uncommitted line of `reader` through the connector's listener.
    ///
    /// Blank and malformed lines are acknowledged and skipped. Stops early,
    /// with an error, once the connector reports a fatal flush failure.
    pub async fn replay<R, E>(&self, reader: R, connector: &Connector<E>) -> Result<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
        E: StatementExecutor,
    {
        let resume_after = self.position.committed();
        let mut summary = ReplaySummary::default();
        let mut lines = reader.lines();
        let mut line_no = 0u64;

        while let Some(line) = lines.next_line().await.context("Failed to read feed line")? {
            line_no += 1;
            if line_no <= resume_after {
                summary.skipped += 1;
                continue;
            }

            let ack = LineAck {
                line: line_no,
                position: Arc::clone(&self.position),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                ack.acknowledge();
                continue;
            }

            let event = match parse_line(trimmed) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed feed line {}: {}", line_no, e);
                    summary.malformed += 1;
                    ack.acknowledge();
                    continue;
                }
            };

            connector
                .listener(&event, &ack)
                .await
                .with_context(|| format!("Failed to process feed line {}", line_no))?;
            summary.events += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_mutation_with_object_value() {
        let event = parse_line(
            r#"{"type":"mutation","key":"k1","value":{"name":"x"},"collection":"airline","cas":9,"vb_id":3}"#,
        )
        .expect("valid line");
        assert!(event.is_mutated());
        assert_eq!(event.key, b"k1");
        assert_eq!(event.value.as_deref(), Some(&br#"{"name":"x"}"#[..]));
        assert_eq!(event.collection_name, "airline");
        assert_eq!(event.cas, 9);
        assert_eq!(event.vb_id, 3);
    }

    #[test]
    fn test_parse_mutation_with_string_value_is_verbatim() {
        let event = parse_line(r#"{"type":"mutation","key":"k1","value":"plain"}"#).expect("valid");
        assert_eq!(event.value.as_deref(), Some(&b"plain"[..]));
        assert_eq!(event.collection_name, "_default");
    }

    #[test]
    fn test_parse_deletion_drops_value() {
        let event = parse_line(
            r#"{"type":"deletion","key":"k1","value":"ignored","event_time":"2024-05-01T10:00:00Z"}"#,
        )
        .expect("valid");
        assert!(event.is_deleted());
        assert!(event.value.is_none());
        assert_eq!(event.event_time.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(parse_line(r#"{"type":"snapshot","key":"k1"}"#).is_err());
    }

    #[test]
    fn test_position_commit_persists_and_resumes() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("feed.checkpoint");

        let position = Arc::new(FeedPosition::open(Some(path.clone())).expect("open"));
        assert_eq!(position.committed(), 0);

        let ack = LineAck {
            line: 4,
            position: Arc::clone(&position),
        };
        ack.acknowledge();
        ack.acknowledge();
        assert_eq!(position.acknowledged(), 4);
        assert_eq!(position.committed(), 0);

        position.commit();
        assert_eq!(position.committed(), 4);
        assert_eq!(std::fs::read_to_string(&path).expect("checkpoint"), "4");

        let reopened = FeedPosition::open(Some(path)).expect("reopen");
        assert_eq!(reopened.committed(), 4);
        assert_eq!(reopened.acknowledged(), 4);
    }

    #[test]
    fn test_failed_checkpoint_write_keeps_position_and_retries() {
        let dir = TempDir::new().expect("temp dir");
        let parent = dir.path().join("not-yet-created");
        let path = parent.join("feed.checkpoint");

        let position = Arc::new(FeedPosition::open(Some(path.clone())).expect("open"));
        LineAck {
            line: 7,
            position: Arc::clone(&position),
        }
        .acknowledge();

        position.commit();
        position.commit();
        assert_eq!(position.committed(), 0);
        assert!(!path.exists());

        std::fs::create_dir(&parent).expect("create dir");
        position.commit();
        assert_eq!(position.committed(), 7);
        assert_eq!(std::fs::read_to_string(&path).expect("checkpoint"), "7");
    }

    #[test]
    fn test_position_rejects_corrupt_checkpoint() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("feed.checkpoint");
        std::fs::write(&path, "not-a-number").expect("write");
        assert!(FeedPosition::open(Some(path)).is_err());
    }

    #[test]
    fn test_acknowledgements_never_move_backwards() {
        let position = Arc::new(FeedPosition::open(None).expect("open"));
        for line in [3, 1, 2] {
            LineAck {
                line,
                position: Arc::clone(&position),
            }
            .acknowledge();
        }
        assert_eq!(position.acknowledged(), 3);
    }
}
