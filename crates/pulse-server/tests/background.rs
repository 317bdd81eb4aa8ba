mod common;

use common::TestApp;
use pulse_server::background::{reconcile_once, run_trigger_worker};
use pulse_server::triggers;
use pulse_social::PostMedia;
use pulse_types::{ChangeEvent, CounterField};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn reconcile_corrects_only_drifted_users() {
    let t = TestApp::new();
    {
        let conn = t.pool.get().unwrap();
        pulse_social::insert_follower(&conn, "alice", "bob").unwrap();
        pulse_social::insert_following(&conn, "bob", "alice").unwrap();
        pulse_social::create_post(&conn, "p1", "alice", "", &PostMedia::None).unwrap();
        // alice drifted: followers never counted, posts double counted.
        pulse_social::adjust(&conn, "alice", CounterField::PostsCount, 2).unwrap();
        // bob is consistent.
        pulse_social::adjust(&conn, "bob", CounterField::FollowingCount, 1).unwrap();
    }

    assert_eq!(reconcile_once(&t.state).await.unwrap(), 1);

    let alice = t.counters("alice");
    assert_eq!(alice.followers_count, 1);
    assert_eq!(alice.posts_count, 1);
    assert_eq!(t.counters("bob").following_count, 1);
    assert_eq!(reconcile_once(&t.state).await.unwrap(), 0);
}

#[tokio::test]
async fn reconcile_keeps_counters_built_from_webhook_events() {
    let t = TestApp::new();
    t.event("created", "users/a/followers/b", json!({})).await;
    t.event("created", "users/b/following/a", json!({})).await;
    t.event("created", "posts/p1", json!({ "authorId": "a" })).await;
    t.event("created", "posts/p2", json!({ "authorId": "a" })).await;
    t.event("deleted", "posts/p2", json!({ "authorId": "a" })).await;
    assert_eq!(t.counters("a").followers_count, 1);

    assert_eq!(reconcile_once(&t.state).await.unwrap(), 0);

    let a = t.counters("a");
    assert_eq!(a.followers_count, 1);
    assert_eq!(a.posts_count, 1);
    assert_eq!(t.counters("b").following_count, 1);
}

#[tokio::test]
async fn worker_dispatches_published_events() {
    let t = TestApp::new();
    let (tx, rx) = triggers::channel(4);
    let mut state = t.state.clone();
    state.triggers = tx.clone();
    let worker = tokio::spawn(run_trigger_worker(Arc::new(state), rx));

    assert!(
        tx.publish(ChangeEvent::created("posts/p1", json!({ "authorId": "u1" })))
            .await
    );

    let mut posts = 0;
    for _ in 0..50 {
        posts = t.counters("u1").posts_count;
        if posts == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(posts, 1);

    worker.abort();
    let _ = worker.await;
}
