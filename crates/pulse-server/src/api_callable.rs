//! Callable entry points.
//!
//! Requests are `{"data": {...}}` and succeed with `{"result": {...}}`.
//! Failures are `{"error": {"code": <kind>, "message": <text>}}` where the
//! kind is one of `unauthenticated`, `invalid-argument`,
//! `failed-precondition`, `not-found` or `internal`.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulse_social::{NewReport, SocialError};
use pulse_types::CallerIdentity;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::middleware::CallerContext;
use crate::{run_blocking, AppState};

/// Callable failure surfaced to the client.
#[derive(Debug, Error)]
pub enum CallableError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    FailedPrecondition(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl CallableError {
    pub fn code(&self) -> &'static str {
        match self {
            CallableError::Unauthenticated(_) => "unauthenticated",
            CallableError::InvalidArgument(_) => "invalid-argument",
            CallableError::FailedPrecondition(_) => "failed-precondition",
            CallableError::NotFound(_) => "not-found",
            CallableError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CallableError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            CallableError::InvalidArgument(_) | CallableError::FailedPrecondition(_) => {
                StatusCode::BAD_REQUEST
            }
            CallableError::NotFound(_) => StatusCode::NOT_FOUND,
            CallableError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (self.status(), body).into_response()
    }
}

impl From<SocialError> for CallableError {
    fn from(e: SocialError) -> Self {
        match e {
            SocialError::NoPendingRequest { .. } => {
                CallableError::FailedPrecondition("No pending request".to_string())
            }
            other => {
                tracing::error!(error = %other, "callable storage failure");
                CallableError::Internal("internal error".to_string())
            }
        }
    }
}

impl From<r2d2::Error> for CallableError {
    fn from(e: r2d2::Error) -> Self {
        tracing::error!(error = %e, "database pool unavailable");
        CallableError::Internal("internal error".to_string())
    }
}

impl From<tokio::task::JoinError> for CallableError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "callable task failed");
        CallableError::Internal("internal error".to_string())
    }
}

/// Handler for `POST /api/callable/{name}`.
pub async fn callable_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, CallableError> {
    let Json(body) = payload.map_err(|e| CallableError::InvalidArgument(e.body_text()))?;
    let data = body.get("data").cloned().unwrap_or(Value::Null);

    let result = match name.as_str() {
        "approveFollowRequest" => approve_follow_request(&state, caller.as_ref(), &data).await?,
        "reportPost" => report_post(&state, caller.as_ref(), &data).await?,
        other => {
            return Err(CallableError::NotFound(format!("unknown callable: {other}")));
        }
    };

    Ok(Json(json!({ "result": result })))
}

/// Approves the pending follow request from `data.followerUid` to the caller.
///
/// The request deletion and both edge writes commit together; the edge
/// creations are then raised on the trigger bus so the counter and
/// notification handlers run as for any other follow.
pub async fn approve_follow_request(
    state: &AppState,
    caller: Option<&CallerIdentity>,
    data: &Value,
) -> Result<Value, CallableError> {
    let caller = caller.ok_or_else(|| CallableError::Unauthenticated("Sign in required".to_string()))?;
    let follower_uid = non_empty_str(data, "followerUid")
        .ok_or_else(|| CallableError::InvalidArgument("followerUid required".to_string()))?;

    let owner_uid = caller.uid.clone();
    let approved = run_blocking(&state.pool, move |conn| -> Result<_, CallableError> {
        Ok(pulse_social::approve_follow_request(conn, &owner_uid, &follower_uid)?)
    })
    .await?;

    for event in approved.change_events() {
        let event = event.with_event_id(uuid::Uuid::new_v4().to_string());
        state.triggers.publish(event).await;
    }

    Ok(json!({ "ok": true }))
}

/// Files a report against `data.postId` on behalf of the caller.
pub async fn report_post(
    state: &AppState,
    caller: Option<&CallerIdentity>,
    data: &Value,
) -> Result<Value, CallableError> {
    let caller = caller.ok_or_else(|| CallableError::Unauthenticated("Sign in required".to_string()))?;
    let post_id = non_empty_str(data, "postId")
        .ok_or_else(|| CallableError::InvalidArgument("postId required".to_string()))?;

    let report = NewReport {
        post_id,
        reason: data.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
        detail: data.get("detail").and_then(Value::as_str).unwrap_or_default().to_string(),
        reported_by: caller.uid.clone(),
    };

    let stored = run_blocking(&state.pool, move |conn| -> Result<_, CallableError> {
        Ok(pulse_social::create_report(conn, &report)?)
    })
    .await?;

    tracing::info!(
        report_id = %stored.report_id,
        post_id = %stored.post_id,
        reported_by = %stored.reported_by,
        "post reported"
    );
    Ok(json!({ "success": true }))
}

fn non_empty_str(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
