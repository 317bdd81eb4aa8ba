#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pulse_db::{create_pool, DbPool, DbRuntimeSettings};
use pulse_notify::Notification;
use pulse_push::{BatchResponse, MulticastMessage, PushDispatcher, PushError, PushTransport, SendResponse};
use pulse_server::triggers::{self, TriggerReceiver};
use pulse_server::{app, router, AppState};
use pulse_social::UpsertUserParams;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // for oneshot

/// Push transport that accepts every token and records each batch.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<MulticastMessage>>,
}

impl RecordingTransport {
    pub fn batches(&self) -> Vec<MulticastMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(BatchResponse {
            responses: message.tokens.iter().map(SendResponse::ok).collect(),
        })
    }
}

pub struct TestApp {
    _db_file: tempfile::NamedTempFile,
    pub pool: DbPool,
    pub state: AppState,
    pub bus: TriggerReceiver,
    pub transport: Arc<RecordingTransport>,
}

impl TestApp {
    pub fn new() -> Self {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(db_file.path().to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
        pulse_db::run_migrations(&pool.get().unwrap()).unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let (tx, bus) = triggers::channel(16);
        let state = AppState {
            pool: pool.clone(),
            push: PushDispatcher::new(pool.clone(), transport.clone()),
            triggers: tx,
            fanout_concurrency: 4,
        };

        Self {
            _db_file: db_file,
            pool,
            state,
            bus,
            transport,
        }
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    /// Dispatches everything queued on the trigger bus, as the worker would.
    pub async fn drain_bus(&mut self) -> usize {
        let mut drained = 0;
        while let Some(event) = self.bus.try_recv() {
            router::dispatch(&self.state, &event).await;
            drained += 1;
        }
        drained
    }

    pub fn user(&self, uid: &str, display_name: Option<&str>, username: Option<&str>) {
        pulse_social::upsert_user(
            &self.pool.get().unwrap(),
            &UpsertUserParams {
                uid: uid.to_string(),
                display_name: display_name.map(str::to_string),
                name: None,
                username: username.map(str::to_string),
            },
        )
        .unwrap();
    }

    /// Delivers a change event through the webhook and returns its response body.
    pub async fn event(&self, kind: &str, path: &str, data: Value) -> Value {
        let (status, body) = post_json(
            self.router(),
            "/api/events",
            None,
            serde_json::json!({ "kind": kind, "path": path, "data": data }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "event {path} rejected: {body}");
        body
    }

    pub fn notifications(&self, uid: &str) -> Vec<Notification> {
        pulse_notify::list_notifications(&self.pool.get().unwrap(), uid, None).unwrap()
    }

    pub fn counters(&self, uid: &str) -> pulse_social::Counters {
        pulse_social::get_counters(&self.pool.get().unwrap(), uid)
            .unwrap()
            .unwrap_or_default()
    }
}

pub async fn post_json(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(uid) = bearer {
        builder = builder.header("Authorization", format!("Bearer {uid}"));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
