//! Shared types and constants for the Pulse social backend.
//!
//! This crate provides the value types passed between the Pulse crates:
//! caller identities, document change events, notification kinds, counter
//! fields, and the product constants used when building notification and
//! push text.
//!
//! It depends on no other workspace crate, so every layer from the store
//! up to the server can share these definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod event;
pub use event::{ChangeEvent, ChangeKind};

/// Display name used when the acting user has no display name on record.
pub const FALLBACK_DISPLAY_NAME: &str = "Someone";

/// Chat preview used when a message has no text but carries media.
pub const MEDIA_PREVIEW: &str = "[Media]";

/// Push body used when a chat preview is empty.
pub const EMPTY_MESSAGE_PUSH_BODY: &str = "[New message]";

/// Maximum number of characters kept in a chat message preview.
pub const CHAT_PREVIEW_MAX_CHARS: usize = 120;

/// Maximum number of characters kept in a comment notification body.
pub const COMMENT_PREVIEW_MAX_CHARS: usize = 60;

/// Maximum number of delivery endpoints accepted by one bulk push send.
pub const PUSH_BATCH_LIMIT: usize = 500;

/// The authenticated identity of a direct caller.
///
/// Issued by the authentication layer and consumed here as an opaque user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// The caller's user id.
    pub uid: String,
}

impl CallerIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Type tag carried by every notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone started following the recipient.
    Follow,
    /// The recipient was mentioned in a comment.
    Mention,
    /// Someone reacted to the recipient's post.
    Like,
    /// Someone commented on the recipient's post.
    Comment,
    /// A chat message arrived in one of the recipient's conversations.
    Chat,
}

impl NotificationKind {
    /// Returns the canonical string label stored with the record.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Mention => "mention",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(Self::Follow),
            "mention" => Ok(Self::Mention),
            "like" => Ok(Self::Like),
            "comment" => Ok(Self::Comment),
            "chat" => Ok(Self::Chat),
            _ => Err(ParseLabelError::new("notification kind", s)),
        }
    }
}

/// Derived numeric fields kept on the user record.
///
/// The set is closed so a counter column name can never come from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterField {
    #[serde(rename = "followersCount")]
    FollowersCount,
    #[serde(rename = "followingCount")]
    FollowingCount,
    #[serde(rename = "postsCount")]
    PostsCount,
}

impl CounterField {
    /// All counter fields, in storage order.
    pub const ALL: [CounterField; 3] = [
        CounterField::FollowersCount,
        CounterField::FollowingCount,
        CounterField::PostsCount,
    ];

    /// Returns the document field name as clients see it.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::FollowersCount => "followersCount",
            Self::FollowingCount => "followingCount",
            Self::PostsCount => "postsCount",
        }
    }

    /// Returns the `users` table column backing this field.
    pub fn column(self) -> &'static str {
        match self {
            Self::FollowersCount => "followers_count",
            Self::FollowingCount => "following_count",
            Self::PostsCount => "posts_count",
        }
    }
}

impl std::fmt::Display for CounterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Lifecycle of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowRequestStatus {
    /// Awaiting a decision by the target user.
    Pending,
    /// Approved; normally the record is deleted by approval instead.
    Approved,
    /// Declined by the target user.
    Declined,
}

impl FollowRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl std::str::FromStr for FollowRequestStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            _ => Err(ParseLabelError::new("follow request status", s)),
        }
    }
}

/// Moderation state of a post report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Pending,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseLabelError::new("report status", s)),
        }
    }
}

/// Error returned when a stored label does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value}")]
pub struct ParseLabelError {
    what: &'static str,
    value: String,
}

impl ParseLabelError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}
