//! Persistence operations for notification records.
//!
//! [`notify`] always appends. [`notify_once`] attaches an idempotency key
//! derived from the triggering document, so a redelivered event writes
//! nothing the second time.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::NotifyError;
use crate::notification::{NewNotification, Notification};

/// Appends a notification for `recipient_uid` with a generated key.
///
/// # Errors
///
/// Returns `NotifyError::Database` on SQL failure or
/// `NotifyError::Serialization` if `extra` cannot be serialised.
pub fn notify(
    conn: &Connection,
    recipient_uid: &str,
    payload: &NewNotification,
) -> Result<Notification, NotifyError> {
    let notification = insert(conn, recipient_uid, payload, None)?;
    // Without a key there is no uniqueness constraint that could swallow the row.
    notification.ok_or(NotifyError::Database(rusqlite::Error::QueryReturnedNoRows))
}

/// Appends a notification unless one with the same key already exists for
/// the recipient.
///
/// Returns `Ok(None)` for a duplicate.
pub fn notify_once(
    conn: &Connection,
    recipient_uid: &str,
    idempotency_key: &str,
    payload: &NewNotification,
) -> Result<Option<Notification>, NotifyError> {
    let notification = insert(conn, recipient_uid, payload, Some(idempotency_key))?;
    if notification.is_none() {
        tracing::debug!(
            recipient_uid,
            idempotency_key,
            kind = payload.kind.as_str(),
            "duplicate notification dropped"
        );
    }
    Ok(notification)
}

fn insert(
    conn: &Connection,
    recipient_uid: &str,
    payload: &NewNotification,
    idempotency_key: Option<&str>,
) -> Result<Option<Notification>, NotifyError> {
    let notification_id = uuid::Uuid::new_v4().to_string();
    let extra_json = payload
        .extra
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let created_at: Option<String> = conn
        .query_row(
            "INSERT INTO notifications (
                notification_id, recipient_uid, kind, from_uid, from_name, post_id,
                post_thumb_url, title, body, extra_json, idempotency_key, read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0)
            ON CONFLICT DO NOTHING
            RETURNING created_at",
            params![
                notification_id,
                recipient_uid,
                payload.kind.as_str(),
                payload.from_uid,
                payload.from_name,
                payload.post_id,
                payload.post_thumb_url,
                payload.title,
                payload.body,
                extra_json,
                idempotency_key,
            ],
            |row| row.get(0),
        )
        .optional()?;

    let Some(created_at) = created_at else {
        return Ok(None);
    };

    tracing::debug!(
        recipient_uid,
        notification_id = %notification_id,
        kind = payload.kind.as_str(),
        "notification written"
    );

    Ok(Some(Notification {
        id: notification_id,
        recipient_uid: recipient_uid.to_string(),
        kind: payload.kind,
        from_uid: payload.from_uid.clone(),
        from_name: payload.from_name.clone(),
        post_id: payload.post_id.clone(),
        post_thumb_url: payload.post_thumb_url.clone(),
        title: payload.title.clone(),
        body: payload.body.clone(),
        extra: payload.extra.clone(),
        idempotency_key: idempotency_key.map(str::to_string),
        read: false,
        created_at,
    }))
}

/// Lists a recipient's notifications, newest first, bounded by `limit`
/// (default 50, max 200).
///
/// # Errors
///
/// Returns `NotifyError` on SQL failure or if a stored record is corrupt.
pub fn list_notifications(
    conn: &Connection,
    recipient_uid: &str,
    limit: Option<u32>,
) -> Result<Vec<Notification>, NotifyError> {
    let limit = limit.unwrap_or(50).min(200);
    let mut stmt = conn.prepare(
        "SELECT notification_id, recipient_uid, kind, from_uid, from_name, post_id,
                post_thumb_url, title, body, extra_json, idempotency_key, read, created_at
         FROM notifications
         WHERE recipient_uid = ?1
         ORDER BY id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![recipient_uid, limit], map_row)?;
    let mut notifications = Vec::new();
    for row in rows {
        let (mut notification, kind, extra_json) = row?;
        notification.kind = kind.parse()?;
        notification.extra = extra_json
            .map(|json| serde_json::from_str(&json))
            .transpose()?;
        notifications.push(notification);
    }
    Ok(notifications)
}

type RawRow = (Notification, String, Option<String>);

fn map_row(row: &Row) -> rusqlite::Result<RawRow> {
    let notification = Notification {
        id: row.get(0)?,
        recipient_uid: row.get(1)?,
        // Replaced by the parsed label once the row is out of rusqlite.
        kind: pulse_types::NotificationKind::Follow,
        from_uid: row.get(3)?,
        from_name: row.get(4)?,
        post_id: row.get(5)?,
        post_thumb_url: row.get(6)?,
        title: row.get(7)?,
        body: row.get(8)?,
        extra: None,
        idempotency_key: row.get(10)?,
        read: row.get(11)?,
        created_at: row.get(12)?,
    };
    Ok((notification, row.get(2)?, row.get(9)?))
}

/// Number of unread notifications for a recipient.
pub fn count_unread(conn: &Connection, recipient_uid: &str) -> Result<i64, NotifyError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE recipient_uid = ?1 AND read = 0",
        [recipient_uid],
        |row| row.get(0),
    )?;
    Ok(count)
}
