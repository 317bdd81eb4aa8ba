//! Social document collections for the Pulse backend.
//!
//! Implements persistence for the documents the event handlers react to and
//! read as context: user records and their push delivery endpoints, follow
//! edges and follow requests, posts with their reactions and comments, post
//! reports, and conversations with their messages.
//!
//! It also hosts the counter adjuster, the leaf primitive that keeps the
//! derived `followersCount`, `followingCount` and `postsCount` fields in step
//! with the edge and post collections using atomic increments.
//!
//! All functions take a borrowed [`rusqlite::Connection`]; callers decide
//! where blocking work runs.

mod conversations;
mod counters;
mod error;
mod follows;
mod posts;
mod users;

pub use conversations::{
    add_message, create_conversation, delete_conversation, delete_message, get_conversation,
    ChatMessage, Conversation,
};
pub use counters::{adjust, adjust_once, get_counters, reconcile_counters, Counters};
pub use error::SocialError;
pub use follows::{
    approve_follow_request, create_follow_request, delete_follow_request, get_follow_request,
    insert_follower, insert_following, is_follower, is_following, put_follow_request,
    remove_follower, remove_following, ApprovedFollow, FollowRequest,
};
pub use posts::{
    add_comment, add_reaction, create_post, create_report, delete_comment, delete_post,
    delete_reaction, get_post, get_report,
    Comment, MediaItem, NewReport, Post, PostMedia, PostReport,
};
pub use users::{
    delete_user, find_user_by_username, get_user, list_push_tokens, register_push_token,
    remove_push_tokens, sync_push_tokens, upsert_user, UpsertUserParams, User,
};

#[cfg(test)]
pub(crate) fn test_conn() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("should open in-memory db");
    pulse_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}
