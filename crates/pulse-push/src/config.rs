use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

fn default_endpoint() -> String {
    DEFAULT_FCM_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fanout_concurrency() -> usize {
    8
}

/// Push delivery settings. Delivery is disabled while `project_id` is empty.
#[derive(Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: String,
    /// OAuth2 bearer token for the FCM HTTP v1 API.
    #[serde(default, skip_serializing)]
    pub access_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum number of conversation members processed at once by the chat
    /// fan-out.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: String::new(),
            access_token: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            fanout_concurrency: default_fanout_concurrency(),
        }
    }
}

impl fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("access_token", &"[REDACTED]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fanout_concurrency", &self.fanout_concurrency)
            .finish()
    }
}

impl PushConfig {
    pub fn is_enabled(&self) -> bool {
        !self.project_id.trim().is_empty()
    }
}
