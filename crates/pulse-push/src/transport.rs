//! The bulk-send seam between the dispatcher and a push provider.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::PushError;

/// One bulk send: a shared title/body and data payload for up to
/// [`pulse_types::PUSH_BATCH_LIMIT`] device tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Per-token failure reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushErrorCode {
    NotRegistered,
    InvalidToken,
    /// Transient or unclassified failure; the token is kept.
    Other(String),
}

impl PushErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotRegistered => "messaging/registration-token-not-registered",
            Self::InvalidToken => "messaging/invalid-registration-token",
            Self::Other(code) => code,
        }
    }

    /// Whether the token should be removed from the owner's registered set.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NotRegistered | Self::InvalidToken)
    }
}

impl fmt::Display for PushErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub token: String,
    pub error: Option<PushErrorCode>,
}

impl SendResponse {
    pub fn ok(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            error: None,
        }
    }

    pub fn failed(token: impl Into<String>, code: PushErrorCode) -> Self {
        Self {
            token: token.into(),
            error: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a bulk send, one entry per token in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }

    /// Tokens the provider reported as permanently invalid.
    pub fn invalid_tokens(&self) -> Vec<String> {
        self.responses
            .iter()
            .filter(|r| r.error.as_ref().is_some_and(PushErrorCode::is_permanent))
            .map(|r| r.token.clone())
            .collect()
    }
}

/// A push provider capable of bulk sends.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Sends `message` to every token in it.
    ///
    /// Per-token failures are reported in the returned [`BatchResponse`];
    /// `Err` means the batch as a whole could not be delivered.
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError>;
}
