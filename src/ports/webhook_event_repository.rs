//! WebhookEventRepository port - Log of processed Stripe webhook events.
//!
//! Stripe delivers at least once: a timeout, a 5xx from this service, or a
//! lost acknowledgement all cause redelivery. The log records every event id
//! with its outcome so a redelivery of a handled event becomes a no-op, while
//! an event whose handling failed is processed again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::{DomainError, ValidationError};

/// Outcome stored for a processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventResult {
    Success,
    Ignored,
    Failed,
}

impl WebhookEventResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventResult::Success => "success",
            WebhookEventResult::Ignored => "ignored",
            WebhookEventResult::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "success" => Ok(WebhookEventResult::Success),
            "ignored" => Ok(WebhookEventResult::Ignored),
            "failed" => Ok(WebhookEventResult::Failed),
            other => Err(ValidationError::invalid_format(
                "webhook_event_result",
                format!("unknown value '{}'", other),
            )),
        }
    }

    /// A final outcome is never reprocessed on redelivery.
    pub fn is_final(&self) -> bool {
        !matches!(self, WebhookEventResult::Failed)
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Stripe event ID (evt_xxx format).
    pub event_id: String,

    /// Type of Stripe event (e.g., "checkout.session.completed").
    pub event_type: String,

    pub processed_at: DateTime<Utc>,

    pub result: WebhookEventResult,

    /// Ignore reason or failure message.
    pub error_message: Option<String>,

    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_result(event_id, event_type, WebhookEventResult::Success, None, payload)
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_result(
            event_id,
            event_type,
            WebhookEventResult::Ignored,
            Some(reason.into()),
            payload,
        )
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_result(
            event_id,
            event_type,
            WebhookEventResult::Failed,
            Some(error.into()),
            payload,
        )
    }

    fn with_result(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        result: WebhookEventResult,
        error_message: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result,
            error_message,
            payload,
        }
    }
}

/// Result of a keyed insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Row was written.
    Inserted,
    /// A row with the same key already existed and was kept.
    AlreadyExists,
}

/// Port for storing and retrieving processed webhook events.
///
/// `event_id` is the primary key, so concurrent deliveries of one event
/// cannot both record a final outcome.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its Stripe event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Save a record.
    ///
    /// Inserts a new row, or replaces an existing row whose result is
    /// `failed`. Returns `AlreadyExists` when a final outcome was already
    /// stored by another delivery.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Delete records processed before `timestamp`; returns the count.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}

/// Result of webhook processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// Event was handled and rows were written.
    Processed,
    /// Event was acknowledged without side effects.
    Ignored,
    /// A final outcome for this event id already existed.
    AlreadyProcessed,
}

impl WebhookResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookResult::Processed => "processed",
            WebhookResult::Ignored => "ignored",
            WebhookResult::AlreadyProcessed => "already_processed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_record_has_no_message() {
        let record = WebhookEventRecord::success(
            "evt_123",
            "checkout.session.completed",
            serde_json::json!({"id": "evt_123"}),
        );

        assert_eq!(record.event_id, "evt_123");
        assert_eq!(record.result, WebhookEventResult::Success);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn ignored_record_includes_reason() {
        let record = WebhookEventRecord::ignored(
            "evt_456",
            "checkout.session.completed",
            "No user id could be resolved",
            serde_json::json!({}),
        );

        assert_eq!(record.result, WebhookEventResult::Ignored);
        assert_eq!(
            record.error_message.as_deref(),
            Some("No user id could be resolved")
        );
    }

    #[test]
    fn only_failed_results_are_reprocessed() {
        assert!(WebhookEventResult::Success.is_final());
        assert!(WebhookEventResult::Ignored.is_final());
        assert!(!WebhookEventResult::Failed.is_final());
    }

    #[test]
    fn result_parses_stored_values() {
        for result in [
            WebhookEventResult::Success,
            WebhookEventResult::Ignored,
            WebhookEventResult::Failed,
        ] {
            assert_eq!(WebhookEventResult::parse(result.as_str()).unwrap(), result);
        }
        assert!(WebhookEventResult::parse("done").is_err());
    }
}
