//! Follow edges and follow requests.
//!
//! A follow relationship is two complementary records: `followers` under the
//! followed user and `following` under the follower. Approval of a follow
//! request writes both together with the request deletion in one
//! transaction.

use pulse_types::{ChangeEvent, FollowRequestStatus};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::SocialError;

/// A pending or settled follow request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub target_uid: String,
    pub requester_uid: String,
    pub status: FollowRequestStatus,
    pub created_at: String,
}

/// Result of a committed follow-request approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedFollow {
    /// The approving user (the one being followed).
    pub target_uid: String,
    pub follower_uid: String,
    pub created_at: String,
    /// Whether `users/{target}/followers/{follower}` did not exist before.
    pub follower_edge_created: bool,
    /// Whether `users/{follower}/following/{target}` did not exist before.
    pub following_edge_created: bool,
}

impl ApprovedFollow {
    /// Creation events for the edge documents this approval brought into existence.
    ///
    /// Edges that already existed were overwritten, not created, and raise nothing.
    pub fn change_events(&self) -> Vec<ChangeEvent> {
        let data = json!({ "createdAt": self.created_at });
        let mut events = Vec::with_capacity(2);
        if self.follower_edge_created {
            events.push(ChangeEvent::created(
                format!("users/{}/followers/{}", self.target_uid, self.follower_uid),
                data.clone(),
            ));
        }
        if self.following_edge_created {
            events.push(ChangeEvent::created(
                format!("users/{}/following/{}", self.follower_uid, self.target_uid),
                data,
            ));
        }
        events
    }
}

/// Records a follow request from `requester_uid` to `target_uid` as pending.
pub fn create_follow_request(
    conn: &Connection,
    target_uid: &str,
    requester_uid: &str,
) -> Result<(), SocialError> {
    put_follow_request(conn, target_uid, requester_uid, FollowRequestStatus::Pending.as_str())
}

/// Writes a follow request with the status label the client stored.
///
/// The label is kept verbatim; anything other than `pending` makes the
/// request ineligible for approval.
pub fn put_follow_request(
    conn: &Connection,
    target_uid: &str,
    requester_uid: &str,
    status: &str,
) -> Result<(), SocialError> {
    conn.execute(
        "INSERT INTO follow_requests (target_uid, requester_uid, status) VALUES (?1, ?2, ?3)
         ON CONFLICT(target_uid, requester_uid) DO UPDATE SET status = excluded.status",
        params![target_uid, requester_uid, status],
    )?;
    Ok(())
}

/// Removes a follow request. Returns `true` if it existed.
pub fn delete_follow_request(
    conn: &Connection,
    target_uid: &str,
    requester_uid: &str,
) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM follow_requests WHERE target_uid = ?1 AND requester_uid = ?2",
        [target_uid, requester_uid],
    )?;
    Ok(count > 0)
}

/// Retrieves a follow request. A missing request is `Ok(None)`.
pub fn get_follow_request(
    conn: &Connection,
    target_uid: &str,
    requester_uid: &str,
) -> Result<Option<FollowRequest>, SocialError> {
    let row = conn
        .query_row(
            "SELECT status, created_at FROM follow_requests
             WHERE target_uid = ?1 AND requester_uid = ?2",
            [target_uid, requester_uid],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    match row {
        Some((status, created_at)) => Ok(Some(FollowRequest {
            target_uid: target_uid.to_string(),
            requester_uid: requester_uid.to_string(),
            status: status.parse()?,
            created_at,
        })),
        None => Ok(None),
    }
}

/// Writes `users/{uid}/followers/{follower_uid}` on its own.
///
/// Returns `true` if the edge did not exist before.
pub fn insert_follower(conn: &Connection, uid: &str, follower_uid: &str) -> Result<bool, SocialError> {
    let inserted = conn.execute(
        "INSERT INTO followers (uid, follower_uid) VALUES (?1, ?2)
         ON CONFLICT(uid, follower_uid) DO NOTHING",
        params![uid, follower_uid],
    )?;
    Ok(inserted > 0)
}

/// Writes `users/{uid}/following/{target_uid}` on its own.
///
/// Returns `true` if the edge did not exist before.
pub fn insert_following(conn: &Connection, uid: &str, target_uid: &str) -> Result<bool, SocialError> {
    let inserted = conn.execute(
        "INSERT INTO following (uid, target_uid) VALUES (?1, ?2)
         ON CONFLICT(uid, target_uid) DO NOTHING",
        params![uid, target_uid],
    )?;
    Ok(inserted > 0)
}

/// Removes `users/{uid}/followers/{follower_uid}`. Returns `true` if it existed.
pub fn remove_follower(conn: &Connection, uid: &str, follower_uid: &str) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM followers WHERE uid = ?1 AND follower_uid = ?2",
        [uid, follower_uid],
    )?;
    Ok(count > 0)
}

/// Removes `users/{uid}/following/{target_uid}`. Returns `true` if it existed.
pub fn remove_following(conn: &Connection, uid: &str, target_uid: &str) -> Result<bool, SocialError> {
    let count = conn.execute(
        "DELETE FROM following WHERE uid = ?1 AND target_uid = ?2",
        [uid, target_uid],
    )?;
    Ok(count > 0)
}

/// Whether `follower_uid` appears in `uid`'s followers.
pub fn is_follower(conn: &Connection, uid: &str, follower_uid: &str) -> Result<bool, SocialError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM followers WHERE uid = ?1 AND follower_uid = ?2)",
        [uid, follower_uid],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Whether `target_uid` appears in `uid`'s following.
pub fn is_following(conn: &Connection, uid: &str, target_uid: &str) -> Result<bool, SocialError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM following WHERE uid = ?1 AND target_uid = ?2)",
        [uid, target_uid],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Consumes a pending follow request and creates both edges atomically.
///
/// The request deletion and the two edge writes commit in one transaction;
/// if the request is absent or not pending nothing is written.
pub fn approve_follow_request(
    conn: &Connection,
    target_uid: &str,
    requester_uid: &str,
) -> Result<ApprovedFollow, SocialError> {
    let tx = conn.unchecked_transaction()?;

    let status: Option<String> = tx
        .query_row(
            "SELECT status FROM follow_requests WHERE target_uid = ?1 AND requester_uid = ?2",
            [target_uid, requester_uid],
            |row| row.get(0),
        )
        .optional()?;

    let pending = matches!(
        status.as_deref().map(str::parse::<FollowRequestStatus>),
        Some(Ok(FollowRequestStatus::Pending))
    );
    if !pending {
        return Err(SocialError::NoPendingRequest {
            target_uid: target_uid.to_string(),
            requester_uid: requester_uid.to_string(),
        });
    }

    tx.execute(
        "DELETE FROM follow_requests WHERE target_uid = ?1 AND requester_uid = ?2",
        [target_uid, requester_uid],
    )?;

    let follower_edge_created = !is_follower(&tx, target_uid, requester_uid)?;
    let following_edge_created = !is_following(&tx, requester_uid, target_uid)?;

    let created_at: String = tx.query_row(
        "INSERT INTO followers (uid, follower_uid) VALUES (?1, ?2)
         ON CONFLICT(uid, follower_uid) DO UPDATE SET created_at = excluded.created_at
         RETURNING created_at",
        [target_uid, requester_uid],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO following (uid, target_uid, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(uid, target_uid) DO UPDATE SET created_at = excluded.created_at",
        params![requester_uid, target_uid, created_at],
    )?;

    tx.commit()?;

    tracing::info!(target_uid, follower_uid = requester_uid, "approved follow request");

    Ok(ApprovedFollow {
        target_uid: target_uid.to_string(),
        follower_uid: requester_uid.to_string(),
        created_at,
        follower_edge_created,
        following_edge_created,
    })
}
