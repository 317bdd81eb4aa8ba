mod common;

use axum::http::StatusCode;
use common::{post_json, TestApp};
use pulse_social::{Comment, PostMedia};
use pulse_types::NotificationKind;
use serde_json::json;

fn create_post(t: &TestApp, post_id: &str, author: &str, media: PostMedia) {
    pulse_social::create_post(&t.pool.get().unwrap(), post_id, author, "caption", &media).unwrap();
}

#[tokio::test]
async fn like_notifies_author_with_empty_thumbnail() {
    let t = TestApp::new();
    t.user("u1", Some("Una"), None);
    t.user("u2", Some("Udo"), None);
    create_post(&t, "p1", "u1", PostMedia::None);
    pulse_social::add_reaction(&t.pool.get().unwrap(), "p1", "u2", "like").unwrap();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "posts/p1/reactions/u2", "data": { "type": "like" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handlers"], json!([{ "handler": "onPostLiked", "ok": true }]));

    let notes = t.notifications("u1");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Like);
    assert_eq!(notes[0].from_uid.as_deref(), Some("u2"));
    assert_eq!(notes[0].from_name.as_deref(), Some("Udo"));
    assert_eq!(notes[0].post_id.as_deref(), Some("p1"));
    assert_eq!(notes[0].post_thumb_url.as_deref(), Some(""));
    assert_eq!(notes[0].title, "liked your post");
    assert!(!notes[0].read);
    assert!(t.notifications("u2").is_empty());
}

#[tokio::test]
async fn like_uses_first_media_url_as_thumbnail() {
    let t = TestApp::new();
    let media: PostMedia = serde_json::from_value(json!([
        { "url": "https://cdn.example/1.jpg", "type": "image" },
        { "url": "https://cdn.example/2.jpg" }
    ]))
    .unwrap();
    create_post(&t, "p1", "u1", media);

    post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "posts/p1/reactions/u2" }),
    )
    .await;

    let notes = t.notifications("u1");
    assert_eq!(notes[0].post_thumb_url.as_deref(), Some("https://cdn.example/1.jpg"));
    assert_eq!(notes[0].from_name.as_deref(), Some("Someone"));
}

#[tokio::test]
async fn self_like_is_not_notified() {
    let t = TestApp::new();
    create_post(&t, "p1", "u1", PostMedia::None);

    let (status, _) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "posts/p1/reactions/u1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(t.notifications("u1").is_empty());
}

#[tokio::test]
async fn own_comment_is_not_notified() {
    let t = TestApp::new();
    t.user("u1", Some("Una"), Some("una"));
    create_post(&t, "p1", "u1", PostMedia::None);

    let body = t
        .event(
            "created",
            "posts/p1/comments/c1",
            json!({ "authorId": "u1", "authorName": "Una", "text": "replying to myself @una" }),
        )
        .await;

    assert_eq!(
        body["handlers"],
        json!([
            { "handler": "onCommentCreated", "ok": true },
            { "handler": "onPostCommented", "ok": true }
        ])
    );
    assert!(t.notifications("u1").is_empty());
}

#[tokio::test]
async fn like_scenario_driven_only_by_events() {
    let t = TestApp::new();
    t.event("created", "users/u1", json!({ "displayName": "Una" })).await;
    t.event("created", "users/u2", json!({ "displayName": "Udo" })).await;
    let post = t.event("created", "posts/p1", json!({ "authorId": "u1", "caption": "" })).await;
    assert_eq!(post["stored"], true);
    assert_eq!(t.counters("u1").posts_count, 1);

    let like = t
        .event("created", "posts/p1/reactions/u2", json!({ "type": "like" }))
        .await;
    assert_eq!(like["stored"], true);
    assert_eq!(like["handlers"], json!([{ "handler": "onPostLiked", "ok": true }]));

    let notes = t.notifications("u1");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Like);
    assert_eq!(notes[0].from_uid.as_deref(), Some("u2"));
    assert_eq!(notes[0].from_name.as_deref(), Some("Udo"));
    assert_eq!(notes[0].post_thumb_url.as_deref(), Some(""));
    assert!(t.notifications("u2").is_empty());
}

#[tokio::test]
async fn chat_scenario_driven_only_by_events() {
    let t = TestApp::new();
    t.event("created", "users/a", json!({ "displayName": "Alice", "fcmTokens": ["token-a"] }))
        .await;
    t.event("created", "users/b", json!({ "displayName": "Bob", "fcmTokens": ["token-b"] }))
        .await;
    t.event("created", "conversations/c1", json!({ "members": ["a", "b"] }))
        .await;

    let body = t
        .event(
            "created",
            "conversations/c1/messages/m1",
            json!({ "senderId": "a", "text": "hello" }),
        )
        .await;
    assert_eq!(body["stored"], true);

    let notes = t.notifications("b");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Chat);
    assert_eq!(notes[0].body, "hello");
    assert!(t.notifications("a").is_empty());

    let batches = t.transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].tokens, vec!["token-b".to_string()]);
    assert_eq!(batches[0].title, "Alice");
}

#[tokio::test]
async fn deleted_documents_leave_the_store() {
    let t = TestApp::new();
    t.event("created", "conversations/c1", json!({ "members": ["a", "b"] }))
        .await;
    t.event("deleted", "conversations/c1", json!({ "members": ["a", "b"] }))
        .await;

    t.event(
        "created",
        "conversations/c1/messages/m1",
        json!({ "senderId": "a", "text": "anyone?" }),
    )
    .await;

    assert!(t.notifications("b").is_empty());
    assert!(t.transport.batches().is_empty());
}

#[tokio::test]
async fn like_on_missing_post_is_a_no_op() {
    let t = TestApp::new();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "posts/gone/reactions/u2" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handlers"][0]["ok"], true);
}

#[tokio::test]
async fn comment_notifies_author_and_mentioned_users() {
    let t = TestApp::new();
    t.user("u1", Some("Una"), Some("una"));
    t.user("u2", Some("Udo"), Some("udo"));
    t.user("u3", Some("Ula"), Some("ula"));
    create_post(&t, "p1", "u1", PostMedia::Single("https://cdn.example/p1.jpg".into()));
    let text = format!("hey @ula and @ghost and @udo {}", "z".repeat(80));
    pulse_social::add_comment(
        &t.pool.get().unwrap(),
        &Comment {
            post_id: "p1".into(),
            comment_id: "c1".into(),
            author_id: "u2".into(),
            author_name: Some("Udo".into()),
            text: text.clone(),
        },
    )
    .unwrap();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({
            "kind": "created",
            "path": "posts/p1/comments/c1",
            "data": { "authorId": "u2", "authorName": "Udo", "text": text }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["handlers"],
        json!([
            { "handler": "onCommentCreated", "ok": true },
            { "handler": "onPostCommented", "ok": true }
        ])
    );

    // Post author gets the comment notification with a 60-char body.
    let owner = t.notifications("u1");
    assert_eq!(owner.len(), 1);
    assert_eq!(owner[0].kind, NotificationKind::Comment);
    assert_eq!(owner[0].body.chars().count(), 60);
    assert_eq!(owner[0].post_thumb_url.as_deref(), Some("https://cdn.example/p1.jpg"));

    // Mentioned user gets the full text; the author's own handle is skipped.
    let mentioned = t.notifications("u3");
    assert_eq!(mentioned.len(), 1);
    assert_eq!(mentioned[0].kind, NotificationKind::Mention);
    assert_eq!(mentioned[0].title, "You were mentioned in a comment");
    assert_eq!(mentioned[0].body, text);
    assert_eq!(mentioned[0].from_uid.as_deref(), Some("u2"));
    assert_eq!(mentioned[0].from_name.as_deref(), Some("Udo"));
    assert_eq!(mentioned[0].post_id.as_deref(), Some("p1"));
    assert!(t.notifications("u2").is_empty());
}

#[tokio::test]
async fn repeated_mention_notifies_once() {
    let t = TestApp::new();
    t.user("u3", None, Some("ula"));

    post_json(
        t.router(),
        "/api/events",
        None,
        json!({
            "kind": "created",
            "path": "posts/p1/comments/c1",
            "data": { "authorId": "u2", "text": "@ula @ula!" }
        }),
    )
    .await;

    assert_eq!(t.notifications("u3").len(), 1);
}

#[tokio::test]
async fn chat_message_notifies_and_pushes_other_members() {
    let t = TestApp::new();
    t.user("a", Some("Alice"), None);
    t.user("b", Some("Bob"), None);
    {
        let conn = t.pool.get().unwrap();
        pulse_social::create_conversation(&conn, "c1", &["a".to_string(), "b".to_string()]).unwrap();
        pulse_social::register_push_token(&conn, "a", "token-a").unwrap();
        pulse_social::register_push_token(&conn, "b", "token-b1").unwrap();
        pulse_social::register_push_token(&conn, "b", "token-b2").unwrap();
    }

    let (status, _) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({
            "kind": "created",
            "path": "conversations/c1/messages/m1",
            "data": { "senderId": "a", "text": "hello" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let notes = t.notifications("b");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Chat);
    assert_eq!(notes[0].title, "Alice");
    assert_eq!(notes[0].body, "hello");
    assert_eq!(notes[0].extra, Some(json!({ "chatId": "c1", "messageId": "m1" })));
    assert!(t.notifications("a").is_empty());

    let batches = t.transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].tokens, vec!["token-b1".to_string(), "token-b2".to_string()]);
    assert_eq!(batches[0].title, "Alice");
    assert_eq!(batches[0].body, "hello");
    assert_eq!(batches[0].data["type"], "chat");
    assert_eq!(batches[0].data["chatId"], "c1");
    assert_eq!(batches[0].data["messageId"], "m1");
    assert_eq!(batches[0].data["senderId"], "a");
    assert_eq!(batches[0].data["senderName"], "Alice");
    assert_eq!(batches[0].data["preview"], "hello");
}

#[tokio::test]
async fn media_only_message_uses_placeholders() {
    let t = TestApp::new();
    {
        let conn = t.pool.get().unwrap();
        pulse_social::create_conversation(&conn, "c1", &["a".to_string(), "b".to_string()]).unwrap();
        pulse_social::register_push_token(&conn, "b", "token-b").unwrap();
    }

    post_json(
        t.router(),
        "/api/events",
        None,
        json!({
            "kind": "created",
            "path": "conversations/c1/messages/m1",
            "data": { "senderId": "a", "text": "", "media": [{ "url": "x.jpg" }] }
        }),
    )
    .await;

    let notes = t.notifications("b");
    assert_eq!(notes[0].body, "[Media]");
    assert_eq!(notes[0].title, "Someone");
    assert_eq!(t.transport.batches()[0].body, "[Media]");
}

#[tokio::test]
async fn empty_message_pushes_fallback_body() {
    let t = TestApp::new();
    {
        let conn = t.pool.get().unwrap();
        pulse_social::create_conversation(&conn, "c1", &["a".to_string(), "b".to_string()]).unwrap();
        pulse_social::register_push_token(&conn, "b", "token-b").unwrap();
    }

    post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "conversations/c1/messages/m1", "data": { "senderId": "a" } }),
    )
    .await;

    assert_eq!(t.notifications("b")[0].body, "");
    let batch = &t.transport.batches()[0];
    assert_eq!(batch.body, "[New message]");
    assert_eq!(batch.data["preview"], "");
}

#[tokio::test]
async fn message_in_missing_conversation_is_a_no_op() {
    let t = TestApp::new();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "conversations/gone/messages/m1", "data": { "senderId": "a" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handlers"][0]["ok"], true);
    assert!(t.transport.batches().is_empty());
}

#[tokio::test]
async fn redelivered_event_has_one_observable_effect() {
    let t = TestApp::new();
    t.user("alice", None, None);
    t.user("bob", Some("Bob"), None);
    pulse_social::insert_follower(&t.pool.get().unwrap(), "alice", "bob").unwrap();
    let event = json!({
        "eventId": "evt-42",
        "kind": "created",
        "path": "users/alice/followers/bob",
        "data": { "createdAt": "2024-01-01 00:00:00" }
    });

    for _ in 0..2 {
        let (status, _) = post_json(t.router(), "/api/events", None, event.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(t.counters("alice").followers_count, 1);
    let notes = t.notifications("alice");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Follow);
    assert_eq!(notes[0].title, "started following you");
    assert_eq!(notes[0].from_name.as_deref(), Some("Bob"));
}

#[tokio::test]
async fn edge_removal_decrements_counters() {
    let t = TestApp::new();
    for (path, kind) in [
        ("users/alice/followers/bob", "created"),
        ("users/bob/following/alice", "created"),
        ("users/alice/followers/bob", "deleted"),
    ] {
        post_json(t.router(), "/api/events", None, json!({ "kind": kind, "path": path })).await;
    }

    assert_eq!(t.counters("alice").followers_count, 0);
    assert_eq!(t.counters("bob").following_count, 1);
}

#[tokio::test]
async fn post_lifecycle_adjusts_posts_count() {
    let t = TestApp::new();
    let created = json!({ "kind": "created", "path": "posts/p1", "data": { "authorId": "u1" } });
    let deleted = json!({ "kind": "deleted", "path": "posts/p1", "data": { "authorId": "u1" } });

    post_json(t.router(), "/api/events", None, created.clone()).await;
    post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "posts/p2", "data": { "authorId": "u1" } }),
    )
    .await;
    assert_eq!(t.counters("u1").posts_count, 2);

    post_json(t.router(), "/api/events", None, deleted).await;
    assert_eq!(t.counters("u1").posts_count, 1);
}

#[tokio::test]
async fn unbound_path_runs_no_handlers() {
    let t = TestApp::new();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "created", "path": "postReports/r1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stored"], false);
    assert_eq!(body["handlers"], json!([]));
}

#[tokio::test]
async fn malformed_event_is_rejected() {
    let t = TestApp::new();

    let (status, body) = post_json(
        t.router(),
        "/api/events",
        None,
        json!({ "kind": "updated", "path": "posts/p1" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
