//! Per-event handlers.
//!
//! Handlers never assume the context documents they read still exist: a
//! missing post, conversation or user is a benign race and the handler
//! returns without effect.

mod chat;
mod follow;
mod post;

use pulse_notify::NotifyError;
use pulse_social::SocialError;
use pulse_types::{ChangeEvent, CounterField};
use rusqlite::Connection;
use thiserror::Error;

use crate::triggers::Handler;
use crate::AppState;

pub use chat::chat_preview;

/// Errors a handler can fail with. They are logged by the router, never
/// returned to the event source.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Social(#[from] SocialError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{failed} of {total} recipients could not be notified")]
    FanOut { failed: usize, total: usize },
}

/// Runs one handler for `event`.
pub async fn run(state: &AppState, handler: &Handler, event: &ChangeEvent) -> Result<(), HandlerError> {
    let name = handler.name();
    match handler.clone() {
        Handler::FollowerAdded { uid, follower_uid } => {
            follow::on_follower_added(state, name, event, uid, follower_uid).await
        }
        Handler::FollowerRemoved { uid } => {
            follow::adjust_edge_counter(state, name, event, uid, CounterField::FollowersCount, -1).await
        }
        Handler::FollowingAdded { uid } => {
            follow::adjust_edge_counter(state, name, event, uid, CounterField::FollowingCount, 1).await
        }
        Handler::FollowingRemoved { uid } => {
            follow::adjust_edge_counter(state, name, event, uid, CounterField::FollowingCount, -1).await
        }
        Handler::PostCreated { post_id } => post::adjust_posts_count(state, name, event, post_id, 1).await,
        Handler::PostDeleted { post_id } => post::adjust_posts_count(state, name, event, post_id, -1).await,
        Handler::PostLiked { post_id, uid } => post::on_post_liked(state, event, post_id, uid).await,
        Handler::CommentMentions { post_id } => post::on_comment_mentions(state, event, post_id).await,
        Handler::PostCommented { post_id } => post::on_post_commented(state, event, post_id).await,
        Handler::ChatMessageCreated {
            conversation_id,
            message_id,
        } => chat::on_chat_message_created(state, event, conversation_id, message_id).await,
    }
}

/// Applies a counter delta, once per event id when the event carries one.
fn apply_delta(
    conn: &Connection,
    event_id: Option<&str>,
    handler: &str,
    uid: &str,
    field: CounterField,
    delta: i64,
) -> Result<(), HandlerError> {
    match event_id {
        Some(id) => {
            pulse_social::adjust_once(conn, &format!("{id}/{handler}"), uid, field, delta)?;
        }
        None => pulse_social::adjust(conn, uid, field, delta)?,
    }
    Ok(())
}

/// Deduplication key for a notification raised by `event`.
///
/// Redeliveries share the event id, or the document path when the source
/// assigns none. `suffix` keeps handlers sharing a source document apart.
fn notification_key(event: &ChangeEvent, suffix: &str) -> String {
    let source = event.event_id.as_deref().unwrap_or(&event.path);
    format!("{source}#{suffix}")
}

/// The user's `displayName`, or the generic fallback.
fn display_name_or_fallback(user: Option<&pulse_social::User>) -> String {
    user.and_then(|u| u.display_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or(pulse_types::FALLBACK_DISPLAY_NAME)
        .to_string()
}
