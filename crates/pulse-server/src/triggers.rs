//! Document-path triggers and the in-process trigger bus.
//!
//! A [`ChangeEvent`] is matched against the bound path patterns to produce a
//! [`Trigger`] carrying the named path parameters. Each trigger expands to
//! the [`Handler`]s bound to it; a comment creation runs two.

use pulse_types::{ChangeEvent, ChangeKind};
use serde::{Serialize, Serializer};
use tokio::sync::mpsc;

/// A matched document change with its path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// `users/{uid}/followers/{followerUid}`
    Follower {
        kind: ChangeKind,
        uid: String,
        follower_uid: String,
    },
    /// `users/{uid}/following/{targetUid}`
    Following {
        kind: ChangeKind,
        uid: String,
        target_uid: String,
    },
    /// `posts/{postId}`
    Post { kind: ChangeKind, post_id: String },
    /// `posts/{postId}/reactions/{uid}`, created only.
    Reaction { post_id: String, uid: String },
    /// `posts/{postId}/comments/{commentId}`, created only.
    Comment { post_id: String, comment_id: String },
    /// `conversations/{cid}/messages/{mid}`, created only.
    Message {
        conversation_id: String,
        message_id: String,
    },
}

impl Trigger {
    /// Matches an event against the bound patterns. Unbound paths and
    /// kinds yield `None`.
    pub fn parse(event: &ChangeEvent) -> Option<Self> {
        use ChangeKind::Created;

        let trigger = match (event.kind, event.segments().as_slice()) {
            (kind, ["users", uid, "followers", follower_uid]) => Trigger::Follower {
                kind,
                uid: uid.to_string(),
                follower_uid: follower_uid.to_string(),
            },
            (kind, ["users", uid, "following", target_uid]) => Trigger::Following {
                kind,
                uid: uid.to_string(),
                target_uid: target_uid.to_string(),
            },
            (kind, ["posts", post_id]) => Trigger::Post {
                kind,
                post_id: post_id.to_string(),
            },
            (Created, ["posts", post_id, "reactions", uid]) => Trigger::Reaction {
                post_id: post_id.to_string(),
                uid: uid.to_string(),
            },
            (Created, ["posts", post_id, "comments", comment_id]) => Trigger::Comment {
                post_id: post_id.to_string(),
                comment_id: comment_id.to_string(),
            },
            (Created, ["conversations", cid, "messages", mid]) => Trigger::Message {
                conversation_id: cid.to_string(),
                message_id: mid.to_string(),
            },
            _ => return None,
        };
        Some(trigger)
    }

    /// The handlers bound to this trigger, in run order.
    pub fn handlers(&self) -> Vec<Handler> {
        match self {
            Trigger::Follower {
                kind: ChangeKind::Created,
                uid,
                follower_uid,
            } => vec![Handler::FollowerAdded {
                uid: uid.clone(),
                follower_uid: follower_uid.clone(),
            }],
            Trigger::Follower {
                kind: ChangeKind::Deleted,
                uid,
                ..
            } => vec![Handler::FollowerRemoved { uid: uid.clone() }],
            Trigger::Following {
                kind: ChangeKind::Created,
                uid,
                ..
            } => vec![Handler::FollowingAdded { uid: uid.clone() }],
            Trigger::Following {
                kind: ChangeKind::Deleted,
                uid,
                ..
            } => vec![Handler::FollowingRemoved { uid: uid.clone() }],
            Trigger::Post {
                kind: ChangeKind::Created,
                post_id,
            } => vec![Handler::PostCreated {
                post_id: post_id.clone(),
            }],
            Trigger::Post {
                kind: ChangeKind::Deleted,
                post_id,
            } => vec![Handler::PostDeleted {
                post_id: post_id.clone(),
            }],
            Trigger::Reaction { post_id, uid } => vec![Handler::PostLiked {
                post_id: post_id.clone(),
                uid: uid.clone(),
            }],
            Trigger::Comment { post_id, .. } => vec![
                Handler::CommentMentions {
                    post_id: post_id.clone(),
                },
                Handler::PostCommented {
                    post_id: post_id.clone(),
                },
            ],
            Trigger::Message {
                conversation_id,
                message_id,
            } => vec![Handler::ChatMessageCreated {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
            }],
        }
    }
}

/// One handler invocation with the path parameters it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    FollowerAdded { uid: String, follower_uid: String },
    FollowerRemoved { uid: String },
    FollowingAdded { uid: String },
    FollowingRemoved { uid: String },
    PostCreated { post_id: String },
    PostDeleted { post_id: String },
    PostLiked { post_id: String, uid: String },
    CommentMentions { post_id: String },
    PostCommented { post_id: String },
    ChatMessageCreated {
        conversation_id: String,
        message_id: String,
    },
}

impl Handler {
    pub fn name(&self) -> &'static str {
        match self {
            Handler::FollowerAdded { .. } => "onFollowerAdded",
            Handler::FollowerRemoved { .. } => "onFollowerRemoved",
            Handler::FollowingAdded { .. } => "onFollowingAdded",
            Handler::FollowingRemoved { .. } => "onFollowingRemoved",
            Handler::PostCreated { .. } => "onPostCreated",
            Handler::PostDeleted { .. } => "onPostDeleted",
            Handler::PostLiked { .. } => "onPostLiked",
            Handler::CommentMentions { .. } => "onCommentCreated",
            Handler::PostCommented { .. } => "onPostCommented",
            Handler::ChatMessageCreated { .. } => "onChatMessageCreated",
        }
    }
}

impl Serialize for Handler {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Sending half of the bus for events raised by this server's own writes.
#[derive(Debug, Clone)]
pub struct TriggerSender(mpsc::Sender<ChangeEvent>);

/// Receiving half, drained by [`crate::background::run_trigger_worker`].
#[derive(Debug)]
pub struct TriggerReceiver(mpsc::Receiver<ChangeEvent>);

/// Creates a bounded trigger bus.
pub fn channel(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (TriggerSender(tx), TriggerReceiver(rx))
}

impl TriggerSender {
    /// Queues `event` for dispatch. Returns `false` if the worker has stopped.
    pub async fn publish(&self, event: ChangeEvent) -> bool {
        let path = event.path.clone();
        match self.0.send(event).await {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(path = %path, "trigger bus closed, event dropped");
                false
            }
        }
    }
}

impl TriggerReceiver {
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.0.recv().await
    }

    /// Returns a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.0.try_recv().ok()
    }
}
