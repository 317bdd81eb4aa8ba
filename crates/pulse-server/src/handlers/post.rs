//! Post handlers: post counting, likes, comments and mentions.

use pulse_notify::NewNotification;
use pulse_types::{ChangeEvent, CounterField, NotificationKind, COMMENT_PREVIEW_MAX_CHARS};

use super::{apply_delta, display_name_or_fallback, notification_key, HandlerError};
use crate::{run_blocking, AppState};

/// `posts/{postId}` created or deleted: adjusts the author's `postsCount`.
///
/// The author comes from the event snapshot since a deleted post can no
/// longer be read.
pub(super) async fn adjust_posts_count(
    state: &AppState,
    handler: &'static str,
    event: &ChangeEvent,
    post_id: String,
    delta: i64,
) -> Result<(), HandlerError> {
    let Some(author_id) = event.data_str("authorId").map(str::to_string) else {
        tracing::debug!(post_id = %post_id, "post snapshot has no authorId, skipping");
        return Ok(());
    };
    let event_id = event.event_id.clone();

    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        apply_delta(
            conn,
            event_id.as_deref(),
            handler,
            &author_id,
            CounterField::PostsCount,
            delta,
        )
    })
    .await
}

/// `posts/{postId}/reactions/{uid}` created: notifies the post author.
pub(super) async fn on_post_liked(
    state: &AppState,
    event: &ChangeEvent,
    post_id: String,
    uid: String,
) -> Result<(), HandlerError> {
    let key = notification_key(event, "like");

    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        let Some(post) = pulse_social::get_post(conn, &post_id)? else {
            tracing::debug!(post_id = %post_id, "liked post no longer exists");
            return Ok(());
        };
        if post.author_id == uid {
            return Ok(());
        }

        let liker = pulse_social::get_user(conn, &uid)?;
        let payload = NewNotification::new(NotificationKind::Like, "liked your post")
            .from_user(&uid, display_name_or_fallback(liker.as_ref()))
            .with_post(&post_id, Some(post.media.thumbnail_url().to_string()));

        pulse_notify::notify_once(conn, &post.author_id, &key, &payload)?;
        Ok(())
    })
    .await
}

/// `posts/{postId}/comments/{commentId}` created: notifies the post author
/// with the start of the comment.
pub(super) async fn on_post_commented(
    state: &AppState,
    event: &ChangeEvent,
    post_id: String,
) -> Result<(), HandlerError> {
    let Some(from_uid) = event.data_str("authorId").map(str::to_string) else {
        tracing::debug!(post_id = %post_id, path = %event.path, "comment has no authorId, skipping");
        return Ok(());
    };
    let text = event.data_str("text").unwrap_or_default().to_string();
    let key = notification_key(event, "comment");

    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        let Some(post) = pulse_social::get_post(conn, &post_id)? else {
            tracing::debug!(post_id = %post_id, "commented post no longer exists");
            return Ok(());
        };
        if post.author_id == from_uid {
            return Ok(());
        }

        let commenter = pulse_social::get_user(conn, &from_uid)?;
        let payload = NewNotification::new(NotificationKind::Comment, "commented on your post")
            .from_user(&from_uid, display_name_or_fallback(commenter.as_ref()))
            .with_post(&post_id, Some(post.media.thumbnail_url().to_string()))
            .with_body(truncate_chars(&text, COMMENT_PREVIEW_MAX_CHARS));

        pulse_notify::notify_once(conn, &post.author_id, &key, &payload)?;
        Ok(())
    })
    .await
}

/// `posts/{postId}/comments/{commentId}` created: notifies every user whose
/// `@username` appears in the comment.
///
/// Unknown usernames are skipped. A user mentioned several times gets one
/// notification. A commenter who mentions their own handle is not notified,
/// the same exclusion likes and comments apply to their author.
pub(super) async fn on_comment_mentions(
    state: &AppState,
    event: &ChangeEvent,
    post_id: String,
) -> Result<(), HandlerError> {
    let text = event.data_str("text").unwrap_or_default().to_string();
    let usernames = pulse_notify::extract_mentions(&text);
    if usernames.is_empty() {
        return Ok(());
    }

    let author_id = event.data_str("authorId").map(str::to_string);
    let author_name = event.data_str("authorName").map(str::to_string);
    let key = notification_key(event, "mention");

    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        let mut payload =
            NewNotification::new(NotificationKind::Mention, "You were mentioned in a comment")
                .with_post(&post_id, None)
                .with_body(text.clone());
        payload.from_uid = author_id.clone();
        payload.from_name = author_name;

        for username in &usernames {
            let Some(user) = pulse_social::find_user_by_username(conn, username)? else {
                tracing::debug!(username = %username, "mentioned username not found");
                continue;
            };
            if author_id.as_deref() == Some(user.uid.as_str()) {
                continue;
            }
            pulse_notify::notify_once(conn, &user.uid, &key, &payload)?;
        }
        Ok(())
    })
    .await
}

/// First `max` characters of `text`.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("hello", 60), "hello");
        assert_eq!(truncate_chars(&"a".repeat(70), 60).len(), 60);
        assert_eq!(truncate_chars("ünïcödé", 3), "ünï");
    }
}
