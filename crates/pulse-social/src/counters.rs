//! Counter adjuster: atomic signed increments on derived user fields.
//!
//! Increments are expressed as a single upsert (`col = col + delta`), never
//! as read-modify-write, so concurrent adjustments to the same field merge
//! commutatively. Adjusting a user that has no record yet creates it with
//! the delta as the field's value.

use pulse_types::CounterField;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::SocialError;

/// Snapshot of a user's derived counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
}

impl Counters {
    pub fn get(&self, field: CounterField) -> i64 {
        match field {
            CounterField::FollowersCount => self.followers_count,
            CounterField::FollowingCount => self.following_count,
            CounterField::PostsCount => self.posts_count,
        }
    }
}

/// Applies `delta` to `field` on the user record `uid`.
pub fn adjust(conn: &Connection, uid: &str, field: CounterField, delta: i64) -> Result<(), SocialError> {
    let column = field.column();
    conn.execute(
        &format!(
            "INSERT INTO users (uid, {column}) VALUES (?1, ?2)
             ON CONFLICT(uid) DO UPDATE SET {column} = {column} + excluded.{column}"
        ),
        params![uid, delta],
    )?;
    tracing::debug!(uid, field = field.field_name(), delta, "adjusted counter");
    Ok(())
}

/// Applies `delta` at most once per `event_key`.
///
/// The ledger row and the increment commit together. Returns `false` when
/// the key was already applied, in which case nothing changes.
pub fn adjust_once(
    conn: &Connection,
    event_key: &str,
    uid: &str,
    field: CounterField,
    delta: i64,
) -> Result<bool, SocialError> {
    let tx = conn.unchecked_transaction()?;
    let recorded = tx.execute(
        "INSERT INTO counter_ledger (event_key, uid, field, delta) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(event_key) DO NOTHING",
        params![event_key, uid, field.field_name(), delta],
    )?;
    if recorded == 0 {
        tracing::debug!(event_key, uid, field = field.field_name(), "counter event already applied");
        return Ok(false);
    }
    adjust(&tx, uid, field, delta)?;
    tx.commit()?;
    Ok(true)
}

/// Reads a user's counters. A missing record is `Ok(None)`.
pub fn get_counters(conn: &Connection, uid: &str) -> Result<Option<Counters>, SocialError> {
    let counters = conn
        .query_row(
            "SELECT followers_count, following_count, posts_count FROM users WHERE uid = ?1",
            [uid],
            |row| {
                Ok(Counters {
                    followers_count: row.get(0)?,
                    following_count: row.get(1)?,
                    posts_count: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(counters)
}

/// Rewrites counters that disagree with the edge and post collections.
///
/// Only mismatched rows are touched. Returns the number of users corrected.
pub fn reconcile_counters(conn: &Connection) -> Result<usize, SocialError> {
    let corrected = conn.execute(
        "WITH actual AS (
            SELECT
                u.uid AS uid,
                (SELECT COUNT(*) FROM followers f WHERE f.uid = u.uid) AS followers,
                (SELECT COUNT(*) FROM following g WHERE g.uid = u.uid) AS following,
                (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.uid) AS posts
            FROM users u
        )
        UPDATE users SET
            followers_count = actual.followers,
            following_count = actual.following,
            posts_count = actual.posts
        FROM actual
        WHERE users.uid = actual.uid
          AND (users.followers_count != actual.followers
               OR users.following_count != actual.following
               OR users.posts_count != actual.posts)",
        [],
    )?;
    Ok(corrected)
}
