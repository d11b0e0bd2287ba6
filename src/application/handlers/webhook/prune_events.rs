//! PruneWebhookEventsHandler - Command handler for webhook log retention.
//!
//! The log only has to outlive the provider's redelivery window; older rows
//! are deleted on a schedule.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::foundation::DomainError;
use crate::ports::WebhookEventRepository;

#[derive(Debug, Clone)]
pub struct PruneWebhookEventsCommand {
    pub now: DateTime<Utc>,
}

/// Number of rows deleted.
pub type PruneWebhookEventsResult = u64;

pub struct PruneWebhookEventsHandler {
    events: Arc<dyn WebhookEventRepository>,
    retention: Duration,
}

impl PruneWebhookEventsHandler {
    pub fn new(events: Arc<dyn WebhookEventRepository>, retention_days: i64) -> Self {
        Self {
            events,
            retention: Duration::days(retention_days),
        }
    }

    pub async fn handle(
        &self,
        cmd: PruneWebhookEventsCommand,
    ) -> Result<PruneWebhookEventsResult, DomainError> {
        let cutoff = cmd.now - self.retention;
        let deleted = self.events.delete_before(cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff, "Pruned webhook event log");
        } else {
            tracing::debug!(cutoff = %cutoff, "No webhook events to prune");
        }
        Ok(deleted)
    }
}
