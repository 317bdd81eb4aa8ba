//! FCM HTTP v1 transport.
//!
//! The v1 API accepts one token per request, so a multicast is sent as
//! concurrent single-token requests and the outcomes are collected in token
//! order.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::json;

use crate::config::PushConfig;
use crate::error::PushError;
use crate::transport::{BatchResponse, MulticastMessage, PushErrorCode, PushTransport, SendResponse};

const NETWORK_ERROR: &str = "messaging/network-error";

pub struct FcmTransport {
    client: reqwest::Client,
    send_url: String,
    access_token: String,
}

impl FcmTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Config` when no project id is set, or
    /// `PushError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PushConfig) -> Result<Self, PushError> {
        if !config.is_enabled() {
            return Err(PushError::Config("push.project_id is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("PulsePush/1.0")
            .build()?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                config.endpoint.trim_end_matches('/'),
                config.project_id
            ),
            access_token: config.access_token.clone(),
        })
    }

    async fn send_one(
        &self,
        token: &str,
        message: &MulticastMessage,
    ) -> Result<SendResponse, reqwest::Error> {
        let payload = json!({
            "message": {
                "token": token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
            }
        });

        let resp = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(SendResponse::ok(token));
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(SendResponse::failed(token, classify_error(status.as_u16(), &body)))
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        let limit = pulse_types::PUSH_BATCH_LIMIT;
        if message.tokens.len() > limit {
            return Err(PushError::BatchTooLarge {
                len: message.tokens.len(),
                limit,
            });
        }

        let results = join_all(
            message
                .tokens
                .iter()
                .map(|token| self.send_one(token, message)),
        )
        .await;

        let mut responses = Vec::with_capacity(results.len());
        let mut network_failures = 0;
        let mut last_error = None;
        for (token, result) in message.tokens.iter().zip(results) {
            match result {
                Ok(response) => responses.push(response),
                Err(e) => {
                    tracing::debug!(error = %e, "FCM request failed");
                    network_failures += 1;
                    responses.push(SendResponse::failed(
                        token,
                        PushErrorCode::Other(NETWORK_ERROR.to_string()),
                    ));
                    last_error = Some(e);
                }
            }
        }

        // Nothing reached the provider: report the batch as undeliverable.
        if network_failures == responses.len() {
            if let Some(e) = last_error {
                return Err(PushError::Http(e));
            }
        }

        Ok(BatchResponse { responses })
    }
}

#[derive(Deserialize)]
struct FcmErrorBody {
    error: FcmError,
}

#[derive(Deserialize)]
struct FcmError {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FcmErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

/// Maps an FCM v1 error response to a per-token error code.
fn classify_error(http_status: u16, body: &str) -> PushErrorCode {
    let parsed = serde_json::from_str::<FcmErrorBody>(body).ok();
    let (code, message) = match &parsed {
        Some(FcmErrorBody { error }) => {
            let code = error
                .details
                .iter()
                .find_map(|d| d.error_code.as_deref())
                .unwrap_or(error.status.as_str());
            (code, error.message.as_str())
        }
        None => ("", ""),
    };

    if code == "UNREGISTERED" || http_status == 404 {
        return PushErrorCode::NotRegistered;
    }
    if code == "INVALID_ARGUMENT" && message.to_ascii_lowercase().contains("token") {
        return PushErrorCode::InvalidToken;
    }
    if code.is_empty() {
        PushErrorCode::Other(format!("messaging/http-{http_status}"))
    } else {
        PushErrorCode::Other(format!(
            "messaging/{}",
            code.to_ascii_lowercase().replace('_', "-")
        ))
    }
}
