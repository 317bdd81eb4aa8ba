//! Pulse server library logic.
//!
//! Hosts the event router: change events arrive on `POST /api/events` (or
//! on the in-process trigger bus for writes this server performs itself)
//! and are dispatched to the per-event handlers. Webhook events are first
//! mirrored into the document store, so handlers read the documents the
//! event stream has delivered. Callable entry points are served under
//! `/api/callable/{name}`.

pub mod api_callable;
pub mod api_events;
pub mod background;
pub mod config;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod router;
pub mod triggers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use pulse_db::DbPool;
use pulse_push::PushDispatcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use triggers::TriggerSender;

/// Application state shared across request handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Push delivery.
    pub push: PushDispatcher,
    /// Bus for change events raised by this server's own writes.
    pub triggers: TriggerSender,
    /// Maximum number of chat recipients processed at once.
    pub fanout_concurrency: usize,
}

/// Runs `f` on a pooled connection inside `spawn_blocking`.
pub(crate) async fn run_blocking<T, E, F>(pool: &DbPool, f: F) -> Result<T, E>
where
    F: FnOnce(&rusqlite::Connection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<r2d2::Error> + From<tokio::task::JoinError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&*conn)
    })
    .await?
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(api_events::events_handler))
        .route("/api/callable/{name}", post(api_callable::callable_handler))
        .layer(axum::middleware::from_fn(middleware::caller_middleware))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
