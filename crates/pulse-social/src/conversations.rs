//! Conversations, their ordered member lists, and chat messages.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SocialError;

/// A conversation and its member uids in stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: String,
    pub members: Vec<String>,
    pub created_at: String,
}

/// A message document under a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub text: String,
    /// Attachment descriptors as the client wrote them.
    #[serde(default)]
    pub media: Vec<Value>,
}

/// Creates a conversation with the given members, replacing any earlier member list.
pub fn create_conversation(
    conn: &Connection,
    conversation_id: &str,
    members: &[String],
) -> Result<(), SocialError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO conversations (conversation_id) VALUES (?1)
         ON CONFLICT(conversation_id) DO NOTHING",
        [conversation_id],
    )?;
    tx.execute(
        "DELETE FROM conversation_members WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO conversation_members (conversation_id, position, uid) VALUES (?1, ?2, ?3)",
        )?;
        for (position, uid) in members.iter().enumerate() {
            stmt.execute(params![conversation_id, position as i64, uid])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Retrieves a conversation with its members. A missing conversation is `Ok(None)`.
pub fn get_conversation(
    conn: &Connection,
    conversation_id: &str,
) -> Result<Option<Conversation>, SocialError> {
    let created_at: Option<String> = conn
        .query_row(
            "SELECT created_at FROM conversations WHERE conversation_id = ?1",
            [conversation_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(created_at) = created_at else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT uid FROM conversation_members WHERE conversation_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map([conversation_id], |row| row.get(0))?;
    let mut members = Vec::new();
    for row in rows {
        members.push(row?);
    }

    Ok(Some(Conversation {
        conversation_id: conversation_id.to_string(),
        members,
        created_at,
    }))
}

/// Removes a conversation and its member list. Messages are left in place.
///
/// Returns `true` if the conversation existed.
pub fn delete_conversation(conn: &Connection, conversation_id: &str) -> Result<bool, SocialError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM conversation_members WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    let count = tx.execute(
        "DELETE FROM conversations WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    tx.commit()?;
    Ok(count > 0)
}

/// Writes a message under a conversation. Rewriting a message id replaces it.
pub fn add_message(conn: &Connection, message: &ChatMessage) -> Result<(), SocialError> {
    let media_json = if message.media.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&message.media)?)
    };
    conn.execute(
        "INSERT INTO conversation_messages (conversation_id, message_id, sender_id, text, media_json)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(conversation_id, message_id) DO UPDATE SET
            sender_id = excluded.sender_id,
            text = excluded.text,
            media_json = excluded.media_json",
        params![
            message.conversation_id,
            message.message_id,
            message.sender_id,
            message.text,
            media_json,
        ],
    )?;
    Ok(())
}

/// Removes a message. Returns `true` if it existed.
pub fn delete_message(
    conn: &Connection,
    conversation_id: &str,
    message_id: &str,
) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM conversation_messages WHERE conversation_id = ?1 AND message_id = ?2",
        [conversation_id, message_id],
    )?;
    Ok(count > 0)
}
