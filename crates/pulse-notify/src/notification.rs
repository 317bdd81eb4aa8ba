//! Notification payload and record types.

use pulse_types::NotificationKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied notification content.
///
/// The writer adds the generated key, `read: false` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from_uid: Option<String>,
    pub from_name: Option<String>,
    pub post_id: Option<String>,
    pub post_thumb_url: Option<String>,
    pub title: String,
    pub body: String,
    pub extra: Option<Value>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            from_uid: None,
            from_name: None,
            post_id: None,
            post_thumb_url: None,
            title: title.into(),
            body: String::new(),
            extra: None,
        }
    }

    pub fn from_user(mut self, uid: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_uid = Some(uid.into());
        self.from_name = Some(name.into());
        self
    }

    pub fn with_post(mut self, post_id: impl Into<String>, thumb_url: Option<String>) -> Self {
        self.post_id = Some(post_id.into());
        self.post_thumb_url = thumb_url;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Auto-generated document key.
    pub id: String,
    pub recipient_uid: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from_uid: Option<String>,
    pub from_name: Option<String>,
    pub post_id: Option<String>,
    pub post_thumb_url: Option<String>,
    pub title: String,
    pub body: String,
    pub extra: Option<Value>,
    /// Key of the source event, when the write was deduplicated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub read: bool,
    pub created_at: String,
}
