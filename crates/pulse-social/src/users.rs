//! User records and registered push delivery endpoints.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::SocialError;

/// A user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub display_name: Option<String>,
    /// Legacy profile name, consulted when `display_name` is empty.
    pub name: Option<String>,
    pub username: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub created_at: String,
}

impl User {
    /// Returns the display name, falling back to `name`, ignoring empty values.
    pub fn preferred_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.name.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Profile fields written by [`upsert_user`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertUserParams {
    pub uid: String,
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

const USER_COLUMNS: &str = "uid, display_name, name, username, followers_count, following_count, posts_count, created_at";

/// Creates or merges a user record.
pub fn upsert_user(conn: &Connection, params: &UpsertUserParams) -> Result<(), SocialError> {
    conn.execute(
        "INSERT INTO users (uid, display_name, name, username) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(uid) DO UPDATE SET
            display_name = COALESCE(excluded.display_name, users.display_name),
            name = COALESCE(excluded.name, users.name),
            username = COALESCE(excluded.username, users.username)",
        params![params.uid, params.display_name, params.name, params.username],
    )?;
    Ok(())
}

/// Retrieves a user by uid. A missing record is `Ok(None)`.
pub fn get_user(conn: &Connection, uid: &str) -> Result<Option<User>, SocialError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"),
            [uid],
            map_row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Finds the user owning `username`.
///
/// Usernames are unique when present (enforced by index), so at most one
/// row matches; the earliest inserted row wins should that ever change.
pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, SocialError> {
    let user = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 ORDER BY rowid ASC LIMIT 1"
            ),
            [username],
            map_row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Deletes a user record together with its registered push tokens.
///
/// Returns `true` if the record existed.
pub fn delete_user(conn: &Connection, uid: &str) -> Result<bool, SocialError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM user_push_tokens WHERE uid = ?1", [uid])?;
    let count = tx.execute("DELETE FROM users WHERE uid = ?1", [uid])?;
    tx.commit()?;
    Ok(count > 0)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        uid: row.get(0)?,
        display_name: row.get(1)?,
        name: row.get(2)?,
        username: row.get(3)?,
        followers_count: row.get(4)?,
        following_count: row.get(5)?,
        posts_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Registers a push delivery endpoint for a user.
///
/// Returns `true` if the token was new for this user.
pub fn register_push_token(conn: &Connection, uid: &str, token: &str) -> Result<bool, SocialError> {
    let inserted = conn.execute(
        "INSERT INTO user_push_tokens (uid, token) VALUES (?1, ?2)
         ON CONFLICT(uid, token) DO NOTHING",
        params![uid, token],
    )?;
    Ok(inserted > 0)
}

/// Lists a user's registered tokens in registration order. Blank tokens are skipped.
pub fn list_push_tokens(conn: &Connection, uid: &str) -> Result<Vec<String>, SocialError> {
    let mut stmt = conn.prepare(
        "SELECT token FROM user_push_tokens WHERE uid = ?1 AND token != '' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([uid], |row| row.get(0))?;
    let mut tokens = Vec::new();
    for row in rows {
        tokens.push(row?);
    }
    Ok(tokens)
}

/// Removes the given tokens from a user's registered set.
///
/// Returns the number of tokens actually removed.
pub fn remove_push_tokens(conn: &Connection, uid: &str, tokens: &[String]) -> Result<usize, SocialError> {
    if tokens.is_empty() {
        return Ok(0);
    }
    let tx = conn.unchecked_transaction()?;
    let mut removed = 0;
    {
        let mut stmt = tx.prepare("DELETE FROM user_push_tokens WHERE uid = ?1 AND token = ?2")?;
        for token in tokens {
            removed += stmt.execute(params![uid, token])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}

/// Makes `tokens` the user's registered set.
///
/// Tokens already registered keep their registration order; new ones are
/// appended in the order given. Blank tokens are ignored.
pub fn sync_push_tokens(conn: &Connection, uid: &str, tokens: &[String]) -> Result<(), SocialError> {
    let wanted: Vec<&String> = tokens.iter().filter(|t| !t.is_empty()).collect();
    let stale: Vec<String> = list_push_tokens(conn, uid)?
        .into_iter()
        .filter(|existing| !wanted.contains(&existing))
        .collect();

    let tx = conn.unchecked_transaction()?;
    {
        let mut delete = tx.prepare("DELETE FROM user_push_tokens WHERE uid = ?1 AND token = ?2")?;
        for token in &stale {
            delete.execute(params![uid, token])?;
        }
    }
    for token in wanted {
        register_push_token(&tx, uid, token)?;
    }
    tx.commit()?;
    Ok(())
}
