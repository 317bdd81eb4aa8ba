//! Error types for social collection operations.

use thiserror::Error;

/// Errors that can occur while reading or writing social documents.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored label (status, kind) did not parse.
    #[error("corrupt stored value: {0}")]
    InvalidLabel(#[from] pulse_types::ParseLabelError),

    /// Approval was attempted without a pending request from `requester_uid`.
    #[error("no pending follow request from {requester_uid} to {target_uid}")]
    NoPendingRequest {
        target_uid: String,
        requester_uid: String,
    },
}
