//! Change-event webhook.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulse_types::ChangeEvent;
use serde_json::json;
use std::sync::Arc;

use crate::handlers::HandlerError;
use crate::{ingest, router, run_blocking, AppState};

/// Handler for `POST /api/events`.
///
/// Accepts one change event, mirrors its snapshot into the store, and runs
/// its handlers before answering. The answer is `200` whatever the handlers
/// did; only an unreadable body is rejected. A failed store write is logged
/// and reported as `stored: false`, and the handlers still run.
pub async fn events_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ChangeEvent>, JsonRejection>,
) -> Response {
    let event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected malformed change event");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let stored = {
        let event = event.clone();
        run_blocking(&state.pool, move |conn| -> Result<bool, HandlerError> {
            Ok(ingest::mirror(conn, &event)?)
        })
        .await
    };
    let stored = stored.unwrap_or_else(|e| {
        tracing::error!(path = %event.path, error = %e, "failed to store change snapshot");
        false
    });

    let runs = router::dispatch(&state, &event).await;
    Json(json!({
        "path": event.path,
        "stored": stored,
        "handlers": runs,
    }))
    .into_response()
}
