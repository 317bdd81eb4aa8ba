//! Follow edge handlers: counter upkeep and the follow notification.

use pulse_notify::NewNotification;
use pulse_types::{ChangeEvent, CounterField, NotificationKind};

use super::{apply_delta, display_name_or_fallback, notification_key, HandlerError};
use crate::{run_blocking, AppState};

/// `users/{uid}/followers/{followerUid}` created: bumps the followed user's
/// `followersCount` and tells them who followed.
pub(super) async fn on_follower_added(
    state: &AppState,
    handler: &'static str,
    event: &ChangeEvent,
    uid: String,
    follower_uid: String,
) -> Result<(), HandlerError> {
    let event_id = event.event_id.clone();
    let key = notification_key(event, "follow");

    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        apply_delta(
            conn,
            event_id.as_deref(),
            handler,
            &uid,
            CounterField::FollowersCount,
            1,
        )?;

        let follower = pulse_social::get_user(conn, &follower_uid)?;
        let follower_name = display_name_or_fallback(follower.as_ref());
        let payload = NewNotification::new(NotificationKind::Follow, "started following you")
            .from_user(&follower_uid, follower_name);

        if pulse_notify::notify_once(conn, &uid, &key, &payload)?.is_some() {
            tracing::info!(uid = %uid, follower_uid = %follower_uid, "follow notification written");
        }
        Ok(())
    })
    .await
}

/// Applies a ±1 edge counter change for the user owning the edge document.
pub(super) async fn adjust_edge_counter(
    state: &AppState,
    handler: &'static str,
    event: &ChangeEvent,
    uid: String,
    field: CounterField,
    delta: i64,
) -> Result<(), HandlerError> {
    let event_id = event.event_id.clone();
    run_blocking(&state.pool, move |conn| -> Result<(), HandlerError> {
        apply_delta(conn, event_id.as_deref(), handler, &uid, field, delta)?;
        tracing::debug!(uid = %uid, field = %field, delta, "edge counter adjusted");
        Ok(())
    })
    .await
}
