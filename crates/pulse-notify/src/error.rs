//! Error types for the notification writer.

/// Errors that can occur while writing or reading notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A database operation failed.
    #[error("notification database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization or deserialization of `extra` failed.
    #[error("notification serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored kind label did not parse.
    #[error("corrupt notification record: {0}")]
    InvalidKind(#[from] pulse_types::ParseLabelError),
}
