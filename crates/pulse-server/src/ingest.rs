//! Mirrors change-event snapshots into the document store.
//!
//! The webhook stores every recognised document before its handlers run, so
//! the context handlers read (posts, conversations, users, edges) reflects
//! the event stream. Created events write the snapshot; deleted events
//! remove the row. Every write is idempotent, so redelivery is harmless.

use pulse_social::{ChatMessage, Comment, PostMedia, SocialError, UpsertUserParams};
use pulse_types::{ChangeEvent, ChangeKind};
use rusqlite::Connection;
use serde_json::Value;

/// A stored document addressed by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// `users/{uid}`
    User { uid: String },
    /// `users/{uid}/followers/{followerUid}`
    Follower { uid: String, follower_uid: String },
    /// `users/{uid}/following/{targetUid}`
    Following { uid: String, target_uid: String },
    /// `users/{uid}/followRequests/{requesterUid}`
    FollowRequest { uid: String, requester_uid: String },
    /// `posts/{postId}`
    Post { post_id: String },
    /// `posts/{postId}/reactions/{uid}`
    Reaction { post_id: String, uid: String },
    /// `posts/{postId}/comments/{commentId}`
    Comment { post_id: String, comment_id: String },
    /// `conversations/{cid}`
    Conversation { conversation_id: String },
    /// `conversations/{cid}/messages/{mid}`
    Message {
        conversation_id: String,
        message_id: String,
    },
}

impl Document {
    /// Matches a document path. Paths outside the mirrored collections yield `None`.
    pub fn parse(event: &ChangeEvent) -> Option<Self> {
        let owned = |s: &&str| s.to_string();
        let document = match event.segments().as_slice() {
            ["users", uid] => Document::User { uid: owned(uid) },
            ["users", uid, "followers", other] => Document::Follower {
                uid: owned(uid),
                follower_uid: owned(other),
            },
            ["users", uid, "following", other] => Document::Following {
                uid: owned(uid),
                target_uid: owned(other),
            },
            ["users", uid, "followRequests", other] => Document::FollowRequest {
                uid: owned(uid),
                requester_uid: owned(other),
            },
            ["posts", post_id] => Document::Post {
                post_id: owned(post_id),
            },
            ["posts", post_id, "reactions", uid] => Document::Reaction {
                post_id: owned(post_id),
                uid: owned(uid),
            },
            ["posts", post_id, "comments", comment_id] => Document::Comment {
                post_id: owned(post_id),
                comment_id: owned(comment_id),
            },
            ["conversations", cid] => Document::Conversation {
                conversation_id: owned(cid),
            },
            ["conversations", cid, "messages", mid] => Document::Message {
                conversation_id: owned(cid),
                message_id: owned(mid),
            },
            _ => return None,
        };
        Some(document)
    }
}

/// Applies `event` to the store.
///
/// Returns `false` when the path is not a mirrored document or the
/// snapshot lacks a field the row cannot exist without.
pub fn mirror(conn: &Connection, event: &ChangeEvent) -> Result<bool, SocialError> {
    let Some(document) = Document::parse(event) else {
        return Ok(false);
    };
    match event.kind {
        ChangeKind::Created => store(conn, document, event),
        ChangeKind::Deleted => remove(conn, document).map(|_| true),
    }
}

fn store(conn: &Connection, document: Document, event: &ChangeEvent) -> Result<bool, SocialError> {
    let text = |key: &str| event.data_str(key).map(str::to_string);

    match document {
        Document::User { uid } => {
            pulse_social::upsert_user(
                conn,
                &UpsertUserParams {
                    uid: uid.clone(),
                    display_name: text("displayName"),
                    name: text("name"),
                    username: text("username"),
                },
            )?;
            if let Some(tokens) = event.data_value("fcmTokens").and_then(Value::as_array) {
                let tokens: Vec<String> = tokens
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                pulse_social::sync_push_tokens(conn, &uid, &tokens)?;
            }
        }
        Document::Follower { uid, follower_uid } => {
            pulse_social::insert_follower(conn, &uid, &follower_uid)?;
        }
        Document::Following { uid, target_uid } => {
            pulse_social::insert_following(conn, &uid, &target_uid)?;
        }
        Document::FollowRequest { uid, requester_uid } => {
            let status = event.data_str("status").unwrap_or_default();
            pulse_social::put_follow_request(conn, &uid, &requester_uid, status)?;
        }
        Document::Post { post_id } => {
            let Some(author_id) = event.data_str("authorId") else {
                return Ok(missing_field(event, "authorId"));
            };
            let media = match event.data_value("media") {
                Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                    tracing::debug!(post_id = %post_id, error = %e, "unrecognised media shape");
                    PostMedia::None
                }),
                None => PostMedia::None,
            };
            let caption = event.data_str("caption").unwrap_or_default();
            pulse_social::create_post(conn, &post_id, author_id, caption, &media)?;
        }
        Document::Reaction { post_id, uid } => {
            let reaction = event.data_str("type").unwrap_or("like");
            pulse_social::add_reaction(conn, &post_id, &uid, reaction)?;
        }
        Document::Comment {
            post_id,
            comment_id,
        } => {
            let Some(author_id) = text("authorId") else {
                return Ok(missing_field(event, "authorId"));
            };
            pulse_social::add_comment(
                conn,
                &Comment {
                    post_id,
                    comment_id,
                    author_id,
                    author_name: text("authorName"),
                    text: text("text").unwrap_or_default(),
                },
            )?;
        }
        Document::Conversation { conversation_id } => {
            let members: Vec<String> = event
                .data_value("members")
                .and_then(Value::as_array)
                .map(|members| {
                    members
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            pulse_social::create_conversation(conn, &conversation_id, &members)?;
        }
        Document::Message {
            conversation_id,
            message_id,
        } => {
            let Some(sender_id) = text("senderId") else {
                return Ok(missing_field(event, "senderId"));
            };
            let media = event
                .data_value("media")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            pulse_social::add_message(
                conn,
                &ChatMessage {
                    conversation_id,
                    message_id,
                    sender_id,
                    text: text("text").unwrap_or_default(),
                    media,
                },
            )?;
        }
    }
    Ok(true)
}

fn remove(conn: &Connection, document: Document) -> Result<bool, SocialError> {
    match document {
        Document::User { uid } => pulse_social::delete_user(conn, &uid),
        Document::Follower { uid, follower_uid } => {
            pulse_social::remove_follower(conn, &uid, &follower_uid)
        }
        Document::Following { uid, target_uid } => {
            pulse_social::remove_following(conn, &uid, &target_uid)
        }
        Document::FollowRequest { uid, requester_uid } => {
            pulse_social::delete_follow_request(conn, &uid, &requester_uid)
        }
        Document::Post { post_id } => pulse_social::delete_post(conn, &post_id),
        Document::Reaction { post_id, uid } => pulse_social::delete_reaction(conn, &post_id, &uid),
        Document::Comment {
            post_id,
            comment_id,
        } => pulse_social::delete_comment(conn, &post_id, &comment_id),
        Document::Conversation { conversation_id } => {
            pulse_social::delete_conversation(conn, &conversation_id)
        }
        Document::Message {
            conversation_id,
            message_id,
        } => pulse_social::delete_message(conn, &conversation_id, &message_id),
    }
}

fn missing_field(event: &ChangeEvent, field: &str) -> bool {
    tracing::debug!(path = %event.path, field, "snapshot missing required field, not stored");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        pulse_db::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn parses_mirrored_paths_only() {
        let doc = |path: &str| Document::parse(&ChangeEvent::created(path, json!({})));
        assert_eq!(doc("users/u1"), Some(Document::User { uid: "u1".into() }));
        assert_eq!(
            doc("users/u1/followRequests/u2"),
            Some(Document::FollowRequest {
                uid: "u1".into(),
                requester_uid: "u2".into()
            })
        );
        assert_eq!(
            doc("conversations/c1"),
            Some(Document::Conversation {
                conversation_id: "c1".into()
            })
        );
        assert_eq!(doc("postReports/r1"), None);
        assert_eq!(doc("users/u1/notifications/n1"), None);
    }

    #[test]
    fn user_snapshot_sets_profile_and_tokens() {
        let conn = conn();
        let event = ChangeEvent::created(
            "users/u1",
            json!({ "displayName": "Una", "username": "una", "fcmTokens": ["t1", "", "t2"] }),
        );
        assert!(mirror(&conn, &event).unwrap());

        let user = pulse_social::get_user(&conn, "u1").unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Una"));
        assert_eq!(pulse_social::list_push_tokens(&conn, "u1").unwrap(), vec!["t1", "t2"]);

        let without_tokens = ChangeEvent::created("users/u1", json!({ "displayName": "Una B" }));
        mirror(&conn, &without_tokens).unwrap();
        assert_eq!(pulse_social::list_push_tokens(&conn, "u1").unwrap(), vec!["t1", "t2"]);
    }

    #[test]
    fn post_snapshot_round_trips_and_deletes() {
        let conn = conn();
        let data = json!({ "authorId": "u1", "caption": "hi", "media": ["https://cdn/a.jpg"] });
        assert!(mirror(&conn, &ChangeEvent::created("posts/p1", data.clone())).unwrap());

        let post = pulse_social::get_post(&conn, "p1").unwrap().unwrap();
        assert_eq!(post.author_id, "u1");
        assert_eq!(post.media.thumbnail_url(), "https://cdn/a.jpg");

        mirror(&conn, &ChangeEvent::deleted("posts/p1", data)).unwrap();
        assert!(pulse_social::get_post(&conn, "p1").unwrap().is_none());
    }

    #[test]
    fn snapshot_without_owner_is_not_stored() {
        let conn = conn();
        assert!(!mirror(&conn, &ChangeEvent::created("posts/p1", json!({}))).unwrap());
        assert!(pulse_social::get_post(&conn, "p1").unwrap().is_none());

        let message = ChangeEvent::created("conversations/c1/messages/m1", json!({ "text": "x" }));
        assert!(!mirror(&conn, &message).unwrap());
    }

    #[test]
    fn follow_request_keeps_client_status() {
        let conn = conn();
        let pending = ChangeEvent::created("users/t/followRequests/r", json!({ "status": "pending" }));
        mirror(&conn, &pending).unwrap();
        assert!(pulse_social::approve_follow_request(&conn, "t", "r").is_ok());

        let unlabelled = ChangeEvent::created("users/t/followRequests/q", json!({}));
        mirror(&conn, &unlabelled).unwrap();
        assert!(pulse_social::approve_follow_request(&conn, "t", "q").is_err());
    }

    #[test]
    fn redelivered_snapshot_is_harmless() {
        let conn = conn();
        let event = ChangeEvent::created(
            "conversations/c1/messages/m1",
            json!({ "senderId": "a", "text": "hello" }),
        );
        mirror(&conn, &event).unwrap();
        mirror(&conn, &event).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM conversation_messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
