//! Push dispatch with endpoint reconciliation.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulse_db::DbPool;
use pulse_types::PUSH_BATCH_LIMIT;

use crate::config::PushConfig;
use crate::error::PushError;
use crate::fcm::FcmTransport;
use crate::transport::{MulticastMessage, PushTransport};

/// Content of a push, shared by every recipient of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Tally of a dispatch, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Recipients that had at least one registered token.
    pub recipients: usize,
    /// Tokens handed to the transport.
    pub tokens: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Tokens removed as permanently invalid.
    pub removed: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.recipients += other.recipients;
        self.tokens += other.tokens;
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

#[derive(Clone)]
pub struct PushDispatcher {
    pool: DbPool,
    transport: Option<Arc<dyn PushTransport>>,
}

impl PushDispatcher {
    pub fn new(pool: DbPool, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            pool,
            transport: Some(transport),
        }
    }

    /// A dispatcher that skips every send.
    pub fn disabled(pool: DbPool) -> Self {
        Self {
            pool,
            transport: None,
        }
    }

    /// Builds the FCM-backed dispatcher, or a disabled one when `config` has
    /// no project id.
    pub fn from_config(pool: DbPool, config: &PushConfig) -> Result<Self, PushError> {
        if !config.is_enabled() {
            tracing::info!("push delivery disabled (no push.project_id configured)");
            return Ok(Self::disabled(pool));
        }
        let transport = FcmTransport::new(config)?;
        tracing::info!(project_id = %config.project_id, "push delivery enabled");
        Ok(Self::new(pool, Arc::new(transport)))
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Sends `message` to every registered token of each recipient.
    ///
    /// Never fails: per-recipient errors are logged and the remaining
    /// recipients are still attempted.
    pub async fn dispatch(&self, recipient_uids: &[String], message: &PushMessage) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(transport) = &self.transport else {
            tracing::debug!(recipients = recipient_uids.len(), "push disabled, skipping dispatch");
            return report;
        };

        for uid in recipient_uids {
            match self.dispatch_to(transport.as_ref(), uid, message).await {
                Ok(partial) => report.merge(partial),
                Err(e) => tracing::warn!(uid = %uid, error = %e, "push dispatch failed"),
            }
        }
        report
    }

    async fn dispatch_to(
        &self,
        transport: &dyn PushTransport,
        uid: &str,
        message: &PushMessage,
    ) -> Result<DispatchReport, PushError> {
        let mut report = DispatchReport::default();
        let tokens = self.load_tokens(uid).await?;
        if tokens.is_empty() {
            tracing::debug!(uid, "recipient has no push tokens");
            return Ok(report);
        }
        report.recipients = 1;

        for chunk in tokens.chunks(PUSH_BATCH_LIMIT) {
            let multicast = MulticastMessage {
                tokens: chunk.to_vec(),
                title: message.title.clone(),
                body: message.body.clone(),
                data: message.data.clone(),
            };

            let batch = match transport.send_multicast(&multicast).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(uid, tokens = chunk.len(), error = %e, "push batch failed");
                    report.failed += chunk.len();
                    continue;
                }
            };

            report.tokens += chunk.len();
            report.delivered += batch.success_count();
            report.failed += batch.failure_count();

            for response in &batch.responses {
                if let Some(code) = response.error.as_ref().filter(|c| !c.is_permanent()) {
                    tracing::debug!(uid, code = %code, "transient push failure");
                }
            }

            let invalid = batch.invalid_tokens();
            if !invalid.is_empty() {
                let removed = self.remove_tokens(uid, invalid).await?;
                tracing::info!(uid, removed, "removed invalid push tokens");
                report.removed += removed;
            }
        }

        Ok(report)
    }

    async fn load_tokens(&self, uid: &str) -> Result<Vec<String>, PushError> {
        let pool = self.pool.clone();
        let uid = uid.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, PushError> {
            let conn = pool.get()?;
            Ok(pulse_social::list_push_tokens(&conn, &uid)?)
        })
        .await?
    }

    async fn remove_tokens(&self, uid: &str, tokens: Vec<String>) -> Result<usize, PushError> {
        let pool = self.pool.clone();
        let uid = uid.to_string();
        tokio::task::spawn_blocking(move || -> Result<usize, PushError> {
            let conn = pool.get()?;
            Ok(pulse_social::remove_push_tokens(&conn, &uid, &tokens)?)
        })
        .await?
    }
}
