//! Change events delivered by the change feed.

use chrono::{DateTime, Utc};
use strum_macros::{Display, EnumIter};

/// Kind of document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Mutation,
    Expiration,
    Deletion,
}

/// A mutation, expiration or deletion notification for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub key: Vec<u8>,
    /// Document body; `None` for expirations and deletions.
    pub value: Option<Vec<u8>>,
    pub collection_name: String,
    /// When the change happened at the source.
    pub event_time: DateTime<Utc>,
    pub cas: u64,
    pub vb_id: u16,
}

impl ChangeEvent {
    pub fn mutation(
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        collection_name: impl Into<String>,
        event_time: DateTime<Utc>,
    ) -> Self {
        ChangeEvent {
            kind: EventKind::Mutation,
            key: key.into(),
            value: Some(value.into()),
            collection_name: collection_name.into(),
            event_time,
            cas: 0,
            vb_id: 0,
        }
    }

    pub fn expiration(
        key: impl Into<Vec<u8>>,
        collection_name: impl Into<String>,
        event_time: DateTime<Utc>,
    ) -> Self {
        ChangeEvent {
            kind: EventKind::Expiration,
            key: key.into(),
            value: None,
            collection_name: collection_name.into(),
            event_time,
            cas: 0,
            vb_id: 0,
        }
    }

    pub fn deletion(
        key: impl Into<Vec<u8>>,
        collection_name: impl Into<String>,
        event_time: DateTime<Utc>,
    ) -> Self {
        ChangeEvent {
            kind: EventKind::Deletion,
            key: key.into(),
            value: None,
            collection_name: collection_name.into(),
            event_time,
            cas: 0,
            vb_id: 0,
        }
    }

    pub fn is_mutated(&self) -> bool {
        self.kind == EventKind::Mutation
    }

    pub fn is_expired(&self) -> bool {
        self.kind == EventKind::Expiration
    }

    pub fn is_deleted(&self) -> bool {
        self.kind == EventKind::Deletion
    }

    /// Key as text, replacing invalid UTF-8.
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}
