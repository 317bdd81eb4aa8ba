//! Dispatches change events to their bound handlers.

use pulse_types::ChangeEvent;
use serde::Serialize;

use crate::handlers;
use crate::triggers::{Handler, Trigger};
use crate::AppState;

/// Outcome of one handler run.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerRun {
    pub handler: Handler,
    pub ok: bool,
}

/// Runs every handler bound to `event`.
///
/// Handler failures are logged and reported in the result, never
/// returned: the event source must not redeliver because of them. Each
/// handler runs regardless of whether an earlier one failed.
pub async fn dispatch(state: &AppState, event: &ChangeEvent) -> Vec<HandlerRun> {
    let Some(trigger) = Trigger::parse(event) else {
        tracing::debug!(path = %event.path, kind = event.kind.as_str(), "no handler bound to event");
        return Vec::new();
    };

    let mut runs = Vec::new();
    for handler in trigger.handlers() {
        let ok = match handlers::run(state, &handler, event).await {
            Ok(()) => {
                tracing::debug!(handler = handler.name(), path = %event.path, "handler completed");
                true
            }
            Err(e) => {
                tracing::error!(
                    handler = handler.name(),
                    path = %event.path,
                    event_id = event.event_id.as_deref().unwrap_or(""),
                    error = %e,
                    "handler failed"
                );
                false
            }
        };
        runs.push(HandlerRun { handler, ok });
    }
    runs
}
