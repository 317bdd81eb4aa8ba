//! Document change events delivered to the trigger router.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened to the document at [`ChangeEvent::path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }
}

/// A single document mutation raised by the document store.
///
/// `data` is the snapshot of the document that was created, or the last
/// snapshot of the document that was deleted. Keys are the client-facing
/// camelCase field names (`authorId`, `senderId`, `text`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Delivery id assigned by the event runtime. Redeliveries reuse it.
    #[serde(default)]
    pub event_id: Option<String>,
    pub kind: ChangeKind,
    /// Slash-separated document path, e.g. `posts/p1/comments/c9`.
    pub path: String,
    #[serde(default)]
    pub data: Value,
}

impl ChangeEvent {
    pub fn created(path: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: None,
            kind: ChangeKind::Created,
            path: path.into(),
            data,
        }
    }

    pub fn deleted(path: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: None,
            kind: ChangeKind::Deleted,
            path: path.into(),
            data,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Path segments with empty segments (leading/trailing slashes) dropped.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Returns a string field of the snapshot, treating empty strings as absent.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns a snapshot field verbatim.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key).filter(|v| !v.is_null())
    }
}
