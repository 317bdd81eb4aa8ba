//! Chat message fan-out: in-app notification and push per member.

use std::collections::BTreeMap;

use futures_util::stream::{self, StreamExt};
use pulse_notify::NewNotification;
use pulse_push::PushMessage;
use pulse_types::{
    ChangeEvent, NotificationKind, CHAT_PREVIEW_MAX_CHARS, EMPTY_MESSAGE_PUSH_BODY,
    FALLBACK_DISPLAY_NAME, MEDIA_PREVIEW,
};
use serde_json::{json, Value};

use super::{notification_key, HandlerError};
use crate::{run_blocking, AppState};

/// Body preview for a chat message.
///
/// Empty text shows `[Media]` when attachments are present and nothing
/// otherwise. Text longer than 120 characters is cut with an ellipsis.
pub fn chat_preview(text: &str, has_media: bool) -> String {
    if text.is_empty() {
        return if has_media {
            MEDIA_PREVIEW.to_string()
        } else {
            String::new()
        };
    }
    if text.chars().count() > CHAT_PREVIEW_MAX_CHARS {
        let mut preview: String = text.chars().take(CHAT_PREVIEW_MAX_CHARS).collect();
        preview.push_str("...");
        return preview;
    }
    text.to_string()
}

/// `conversations/{cid}/messages/{mid}` created.
///
/// Every member except the sender gets a `chat` notification followed by a
/// push to their registered devices. Members are processed concurrently up
/// to `fanout_concurrency`; one member's failure does not stop the others.
pub(super) async fn on_chat_message_created(
    state: &AppState,
    event: &ChangeEvent,
    conversation_id: String,
    message_id: String,
) -> Result<(), HandlerError> {
    let Some(sender_id) = event.data_str("senderId").map(str::to_string) else {
        tracing::debug!(path = %event.path, "message has no senderId, skipping");
        return Ok(());
    };
    let text = match event.data_value("text") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let has_media = event
        .data_value("media")
        .and_then(Value::as_array)
        .is_some_and(|media| !media.is_empty());
    let preview = chat_preview(&text, has_media);

    let context = {
        let conversation_id = conversation_id.clone();
        let sender_id = sender_id.clone();
        run_blocking(&state.pool, move |conn| -> Result<_, HandlerError> {
            let Some(conversation) = pulse_social::get_conversation(conn, &conversation_id)? else {
                return Ok(None);
            };
            let sender_name = pulse_social::get_user(conn, &sender_id)?
                .as_ref()
                .and_then(|user| user.preferred_name())
                .unwrap_or(FALLBACK_DISPLAY_NAME)
                .to_string();
            Ok(Some((conversation.members, sender_name)))
        })
        .await?
    };

    let Some((members, sender_name)) = context else {
        tracing::debug!(conversation_id = %conversation_id, "conversation no longer exists");
        return Ok(());
    };

    let recipients: Vec<String> = members
        .into_iter()
        .filter(|uid| !uid.is_empty() && *uid != sender_id)
        .collect();
    let total = recipients.len();

    let notification = NewNotification::new(NotificationKind::Chat, sender_name.clone())
        .from_user(&sender_id, sender_name.clone())
        .with_body(preview.clone())
        .with_extra(json!({ "chatId": conversation_id, "messageId": message_id }));

    let push = PushMessage {
        title: sender_name.clone(),
        body: if preview.is_empty() {
            EMPTY_MESSAGE_PUSH_BODY.to_string()
        } else {
            preview.clone()
        },
        data: BTreeMap::from([
            ("type".to_string(), "chat".to_string()),
            ("chatId".to_string(), conversation_id.clone()),
            ("messageId".to_string(), message_id.clone()),
            ("senderId".to_string(), sender_id.clone()),
            ("senderName".to_string(), sender_name),
            ("preview".to_string(), preview),
        ]),
    };

    let key = notification_key(event, "chat");
    let failed = stream::iter(recipients)
        .map(|uid| deliver(state, uid, &key, &notification, &push))
        .buffer_unordered(state.fanout_concurrency.max(1))
        .filter(|delivered| std::future::ready(!delivered))
        .count()
        .await;

    if failed > 0 {
        return Err(HandlerError::FanOut { failed, total });
    }
    tracing::debug!(conversation_id = %conversation_id, recipients = total, "chat fan-out complete");
    Ok(())
}

/// Writes one member's notification, then pushes if it was new.
///
/// Returns `false` when the notification could not be written. Push
/// failures are logged by the dispatcher and do not count.
async fn deliver(
    state: &AppState,
    uid: String,
    key: &str,
    notification: &NewNotification,
    push: &PushMessage,
) -> bool {
    let written = {
        let uid = uid.clone();
        let key = key.to_string();
        let notification = notification.clone();
        run_blocking(&state.pool, move |conn| -> Result<_, HandlerError> {
            Ok(pulse_notify::notify_once(conn, &uid, &key, &notification)?)
        })
        .await
    };

    match written {
        Ok(Some(_)) => {
            state.push.dispatch(std::slice::from_ref(&uid), push).await;
            true
        }
        Ok(None) => {
            tracing::debug!(uid = %uid, "chat notification already delivered, skipping push");
            true
        }
        Err(e) => {
            tracing::error!(uid = %uid, error = %e, "failed to write chat notification");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::chat_preview;

    #[test]
    fn empty_text_without_media_is_empty() {
        assert_eq!(chat_preview("", false), "");
    }

    #[test]
    fn empty_text_with_media_is_placeholder() {
        assert_eq!(chat_preview("", true), "[Media]");
    }

    #[test]
    fn long_text_is_cut_at_120_chars() {
        let text = "x".repeat(150);
        let preview = chat_preview(&text, false);
        assert_eq!(preview, format!("{}...", "x".repeat(120)));
    }

    #[test]
    fn exactly_120_chars_is_kept() {
        let text = "y".repeat(120);
        assert_eq!(chat_preview(&text, true), text);
    }

    #[test]
    fn text_wins_over_media() {
        assert_eq!(chat_preview("hello", true), "hello");
    }
}
