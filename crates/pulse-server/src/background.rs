//! Background tasks for the Pulse server.
//!
//! Includes:
//! - Draining the trigger bus.
//! - Reconciling cached counters against the edge and post tables.

use crate::handlers::HandlerError;
use crate::triggers::TriggerReceiver;
use crate::{router, run_blocking, AppState};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Dispatches every event published on the trigger bus until all senders
/// are dropped.
pub async fn run_trigger_worker(state: Arc<AppState>, mut rx: TriggerReceiver) {
    tracing::info!("starting trigger worker");
    while let Some(event) = rx.recv().await {
        let runs = router::dispatch(&state, &event).await;
        tracing::debug!(path = %event.path, handlers = runs.len(), "bus event dispatched");
    }
    tracing::info!("trigger bus closed, worker stopping");
}

/// Starts the counter reconciliation task.
///
/// Runs indefinitely, periodically rewriting `followersCount`,
/// `followingCount` and `postsCount` for users whose cached value disagrees
/// with the underlying documents.
pub async fn start_reconcile_task(state: Arc<AppState>, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::info!("counter reconciliation disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting counter reconciliation task");

    loop {
        sleep(interval).await;
        match reconcile_once(&state).await {
            Ok(0) => tracing::debug!("counters consistent"),
            Ok(corrected) => tracing::warn!(corrected, "reconciled drifted user counters"),
            Err(e) => tracing::error!("counter reconciliation failed: {}", e),
        }
    }
}

/// Runs one reconciliation pass. Returns the number of users corrected.
pub async fn reconcile_once(state: &AppState) -> Result<usize, HandlerError> {
    run_blocking(&state.pool, |conn| -> Result<usize, HandlerError> {
        Ok(pulse_social::reconcile_counters(conn)?)
    })
    .await
}
