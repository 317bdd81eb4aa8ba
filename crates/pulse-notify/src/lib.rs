//! In-app notifications for the Pulse backend.
//!
//! Implements the notification writer, which appends immutable records to a
//! recipient's notification collection, and the mention extractor used by
//! the comment handler to find `@username` references.
//!
//! # Record shape
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `kind` | `follow`, `mention`, `like`, `comment` or `chat` |
//! | `fromUid` / `fromName` | The acting user |
//! | `postId` / `postThumbUrl` | Post context, when there is one |
//! | `title` / `body` | Display text |
//! | `extra` | Handler-specific JSON (conversation and message ids for chat) |
//! | `read` | Always `false` on creation |
//! | `createdAt` | Server time of the write |
//!
//! Self-notification is excluded by the calling handlers, not here.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulse_notify::{notify_once, NewNotification};
//! use pulse_types::NotificationKind;
//!
//! let payload = NewNotification::new(NotificationKind::Like, "liked your post")
//!     .from_user(&liker_uid, &liker_name)
//!     .with_post(&post_id, thumb_url);
//! notify_once(&conn, &author_uid, &event_key, &payload)?;
//! ```

mod error;
mod mention;
mod notification;
mod store;

pub use error::NotifyError;
pub use mention::extract_mentions;
pub use notification::{NewNotification, Notification};
pub use store::{count_unread, list_notifications, notify, notify_once};

#[cfg(test)]
mod tests;
