//! Unit tests for the notification writer.

use pulse_types::NotificationKind;
use rusqlite::Connection;
use serde_json::json;

use crate::notification::NewNotification;
use crate::store::{count_unread, list_notifications, notify, notify_once};

fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    pulse_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn like_payload() -> NewNotification {
    NewNotification::new(NotificationKind::Like, "liked your post")
        .from_user("bob", "Bob")
        .with_post("p1", Some(String::new()))
}

// ── notify ───────────────────────────────────────────────────────────

#[test]
fn notify_writes_unread_record_with_generated_key() {
    let conn = test_db();

    let written = notify(&conn, "alice", &like_payload()).expect("notify should succeed");

    assert!(!written.id.is_empty());
    assert!(!written.read);
    assert!(!written.created_at.is_empty());
    assert_eq!(written.kind, NotificationKind::Like);
    assert_eq!(written.idempotency_key, None);

    let stored = list_notifications(&conn, "alice", None).expect("list should succeed");
    assert_eq!(stored, vec![written]);
}

#[test]
fn notify_appends_distinct_records() {
    let conn = test_db();

    let first = notify(&conn, "alice", &like_payload()).expect("first");
    let second = notify(&conn, "alice", &like_payload()).expect("second");

    assert_ne!(first.id, second.id);
    assert_eq!(count_unread(&conn, "alice").expect("count"), 2);
}

#[test]
fn empty_thumbnail_is_stored_as_empty_string() {
    let conn = test_db();
    notify(&conn, "alice", &like_payload()).expect("notify");

    let stored = list_notifications(&conn, "alice", None).expect("list");
    assert_eq!(stored[0].post_thumb_url.as_deref(), Some(""));
    assert_eq!(stored[0].post_id.as_deref(), Some("p1"));
    assert_eq!(stored[0].from_name.as_deref(), Some("Bob"));
}

#[test]
fn extra_round_trips_through_json() {
    let conn = test_db();
    let payload = NewNotification::new(NotificationKind::Chat, "Bob")
        .from_user("bob", "Bob")
        .with_body("hello")
        .with_extra(json!({ "chatId": "c1", "messageId": "m1" }));

    notify(&conn, "alice", &payload).expect("notify");

    let stored = list_notifications(&conn, "alice", None).expect("list");
    assert_eq!(stored[0].kind, NotificationKind::Chat);
    assert_eq!(stored[0].body, "hello");
    assert_eq!(
        stored[0].extra,
        Some(json!({ "chatId": "c1", "messageId": "m1" }))
    );
}

// ── notify_once ──────────────────────────────────────────────────────

#[test]
fn notify_once_drops_duplicate_key() {
    let conn = test_db();

    let first = notify_once(&conn, "alice", "posts/p1/reactions/bob", &like_payload())
        .expect("first write");
    let second = notify_once(&conn, "alice", "posts/p1/reactions/bob", &like_payload())
        .expect("second write");

    assert!(first.is_some());
    assert!(second.is_none(), "duplicate key should be dropped");
    assert_eq!(count_unread(&conn, "alice").expect("count"), 1);
}

#[test]
fn notify_once_key_is_scoped_per_recipient() {
    let conn = test_db();
    let key = "conversations/c1/messages/m1";

    assert!(notify_once(&conn, "alice", key, &like_payload())
        .expect("alice")
        .is_some());
    assert!(notify_once(&conn, "carol", key, &like_payload())
        .expect("carol")
        .is_some());
}

#[test]
fn notify_once_and_notify_do_not_collide() {
    let conn = test_db();

    notify(&conn, "alice", &like_payload()).expect("plain");
    notify(&conn, "alice", &like_payload()).expect("plain again");
    let keyed = notify_once(&conn, "alice", "k", &like_payload()).expect("keyed");

    assert_eq!(keyed.and_then(|n| n.idempotency_key).as_deref(), Some("k"));
    assert_eq!(count_unread(&conn, "alice").expect("count"), 3);
}

// ── list_notifications ───────────────────────────────────────────────

#[test]
fn list_is_newest_first_and_bounded() {
    let conn = test_db();
    for i in 0..5 {
        let payload = NewNotification::new(NotificationKind::Follow, "started following you")
            .from_user(format!("u{i}"), "Someone");
        notify(&conn, "alice", &payload).expect("notify");
    }

    let page = list_notifications(&conn, "alice", Some(2)).expect("list");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].from_uid.as_deref(), Some("u4"));
    assert_eq!(page[1].from_uid.as_deref(), Some("u3"));
}

#[test]
fn list_only_returns_recipient_records() {
    let conn = test_db();
    notify(&conn, "alice", &like_payload()).expect("alice");
    notify(&conn, "carol", &like_payload()).expect("carol");

    let alice = list_notifications(&conn, "alice", None).expect("list");
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].recipient_uid, "alice");
    assert!(list_notifications(&conn, "dave", None)
        .expect("list")
        .is_empty());
}

#[test]
fn count_unread_ignores_read_records() {
    let conn = test_db();
    let written = notify(&conn, "alice", &like_payload()).expect("notify");
    notify(&conn, "alice", &like_payload()).expect("notify");

    conn.execute(
        "UPDATE notifications SET read = 1 WHERE notification_id = ?1",
        [&written.id],
    )
    .expect("mark read");

    assert_eq!(count_unread(&conn, "alice").expect("count"), 1);
}
