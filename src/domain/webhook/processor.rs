//! Webhook processor - Orchestrates idempotent webhook event handling.
//!
//! ## Flow
//!
//! 1. Skip the event if a final outcome (success or ignored) is logged
//! 2. Dispatch to the handler registered for the event type
//! 3. Log the outcome; a failed outcome is overwritten by a later attempt
//!
//! ## Concurrent Deliveries
//!
//! The log is keyed by event id. When two deliveries race, the first to
//! store a final outcome wins and the other reports `AlreadyProcessed`.
//! Handlers still write keyed on the provider ids, so a lost race never
//! duplicates rows.

use async_trait::async_trait;
use std::sync::Arc;

use super::{StripeEvent, StripeEventType, WebhookError};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult};

/// Handler for one or more Stripe event types.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    /// Returns the event type(s) this handler processes.
    fn handles(&self) -> Vec<StripeEventType>;

    /// Handles the webhook event.
    ///
    /// Returns `Err(WebhookError::Ignored(_))` when the event should be
    /// acknowledged without side effects.
    async fn handle(&self, event: &StripeEvent) -> Result<(), WebhookError>;
}

/// Routes events to their handler.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    /// Find a handler for the given event type.
    fn get_handler(&self, event_type: &StripeEventType) -> Option<&dyn WebhookEventHandler>;

    /// Dispatch an event to its handler, ignoring unhandled types.
    async fn dispatch(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        let event_type = event.parsed_type();
        match self.get_handler(&event_type) {
            Some(handler) => handler.handle(event).await,
            None => Err(WebhookError::Ignored(format!(
                "Unhandled event type: {}",
                event.event_type
            ))),
        }
    }
}

/// Processes webhook events with idempotency guarantees.
pub struct IdempotentWebhookProcessor<D: WebhookDispatcher> {
    repository: Arc<dyn WebhookEventRepository>,
    dispatcher: D,
}

impl<D: WebhookDispatcher> IdempotentWebhookProcessor<D> {
    pub fn new(repository: Arc<dyn WebhookEventRepository>, dispatcher: D) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Process a verified event at most once to a final outcome.
    pub async fn process(&self, event: StripeEvent) -> Result<WebhookResult, WebhookError> {
        if let Some(existing) = self.repository.find_by_event_id(&event.id).await? {
            if existing.result.is_final() {
                tracing::info!(event_id = %event.id, "Webhook event already processed");
                return Ok(WebhookResult::AlreadyProcessed);
            }
            tracing::info!(event_id = %event.id, "Retrying previously failed webhook event");
        }

        let result = self.dispatcher.dispatch(&event).await;

        let payload = serde_json::to_value(&event)
            .map_err(|e| WebhookError::ParseError(format!("Failed to serialize event: {}", e)))?;
        let record = match &result {
            Ok(()) => WebhookEventRecord::success(&event.id, &event.event_type, payload),
            Err(WebhookError::Ignored(reason)) => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload)
            }
            Err(e) => WebhookEventRecord::failed(&event.id, &event.event_type, e.to_string(), payload),
        };

        match result {
            Ok(()) => match self.repository.save(record).await? {
                SaveResult::Inserted => Ok(WebhookResult::Processed),
                SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
            },
            Err(WebhookError::Ignored(reason)) => {
                tracing::info!(event_id = %event.id, reason = %reason, "Webhook event ignored");
                match self.repository.save(record).await? {
                    SaveResult::Inserted => Ok(WebhookResult::Ignored),
                    SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
                }
            }
            Err(e) => {
                // The handler error is what the caller needs to see, even if
                // logging the failure also fails.
                if let Err(log_err) = self.repository.save(record).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %log_err,
                        "Failed to record webhook failure"
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::DomainError;
    use crate::ports::WebhookEventResult;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tokio::sync::RwLock;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct MockWebhookRepository {
        records: RwLock<HashMap<String, WebhookEventRecord>>,
    }

    impl MockWebhookRepository {
        async fn result_of(&self, event_id: &str) -> Option<WebhookEventResult> {
            self.records.read().await.get(event_id).map(|r| r.result)
        }
    }

    #[async_trait]
    impl WebhookEventRepository for MockWebhookRepository {
        async fn find_by_event_id(
            &self,
            event_id: &str,
        ) -> Result<Option<WebhookEventRecord>, DomainError> {
            Ok(self.records.read().await.get(event_id).cloned())
        }

        async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
            let mut records = self.records.write().await;
            match records.get(&record.event_id) {
                Some(existing) if existing.result.is_final() => Ok(SaveResult::AlreadyExists),
                _ => {
                    records.insert(record.event_id.clone(), record);
                    Ok(SaveResult::Inserted)
                }
            }
        }

        async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
            let mut records = self.records.write().await;
            let before = records.len();
            records.retain(|_, r| r.processed_at >= timestamp);
            Ok((before - records.len()) as u64)
        }
    }

    /// Handler whose behaviour can be flipped between calls.
    struct MockHandler {
        handles_types: Vec<StripeEventType>,
        call_count: AtomicU32,
        fail: AtomicBool,
        ignore: bool,
    }

    impl MockHandler {
        fn new(handles: Vec<StripeEventType>) -> Self {
            Self {
                handles_types: handles,
                call_count: AtomicU32::new(0),
                fail: AtomicBool::new(false),
                ignore: false,
            }
        }

        fn failing(handles: Vec<StripeEventType>) -> Self {
            let handler = Self::new(handles);
            handler.fail.store(true, Ordering::SeqCst);
            handler
        }

        fn ignoring(handles: Vec<StripeEventType>) -> Self {
            Self {
                ignore: true,
                ..Self::new(handles)
            }
        }

        fn call_count(&self) -> u32 {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WebhookEventHandler for MockHandler {
        fn handles(&self) -> Vec<StripeEventType> {
            self.handles_types.clone()
        }

        async fn handle(&self, _event: &StripeEvent) -> Result<(), WebhookError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(WebhookError::Database("Simulated failure".to_string()))
            } else if self.ignore {
                Err(WebhookError::Ignored("Test ignore".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct SingleHandlerDispatcher {
        handler: Arc<MockHandler>,
    }

    #[async_trait]
    impl WebhookDispatcher for SingleHandlerDispatcher {
        fn get_handler(&self, event_type: &StripeEventType) -> Option<&dyn WebhookEventHandler> {
            if self.handler.handles_types.contains(event_type) {
                Some(self.handler.as_ref())
            } else {
                None
            }
        }
    }

    fn processor(
        repo: Arc<MockWebhookRepository>,
        handler: Arc<MockHandler>,
    ) -> IdempotentWebhookProcessor<SingleHandlerDispatcher> {
        IdempotentWebhookProcessor::new(repo, SingleHandlerDispatcher { handler })
    }

    fn checkout_event(id: &str) -> StripeEvent {
        StripeEvent::for_test("checkout.session.completed", serde_json::json!({})).with_id(id)
    }

    // ══════════════════════════════════════════════════════════════
    // Dispatcher Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn dispatcher_ignores_unhandled_event_types() {
        let handler = Arc::new(MockHandler::new(vec![StripeEventType::CheckoutSessionCompleted]));
        let dispatcher = SingleHandlerDispatcher { handler: handler.clone() };
        let event = StripeEvent::for_test("invoice.paid", serde_json::json!({}));

        let result = dispatcher.dispatch(&event).await;

        assert!(matches!(result, Err(WebhookError::Ignored(msg)) if msg.contains("invoice.paid")));
        assert_eq!(handler.call_count(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Processor Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn processes_new_event_and_records_success() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::new(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo.clone(), handler.clone());

        let result = processor.process(checkout_event("evt_new")).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(handler.call_count(), 1);
        assert_eq!(repo.result_of("evt_new").await, Some(WebhookEventResult::Success));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_skipped() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::new(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo, handler.clone());

        processor.process(checkout_event("evt_dup")).await.unwrap();
        let second = processor.process(checkout_event("evt_dup")).await.unwrap();

        assert_eq!(second, WebhookResult::AlreadyProcessed);
        assert_eq!(handler.call_count(), 1);
    }

    #[tokio::test]
    async fn ignored_event_is_recorded_and_not_redispatched() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::ignoring(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo.clone(), handler.clone());

        let first = processor.process(checkout_event("evt_ign")).await.unwrap();
        let second = processor.process(checkout_event("evt_ign")).await.unwrap();

        assert_eq!(first, WebhookResult::Ignored);
        assert_eq!(second, WebhookResult::AlreadyProcessed);
        assert_eq!(handler.call_count(), 1);
        assert_eq!(repo.result_of("evt_ign").await, Some(WebhookEventResult::Ignored));
    }

    #[tokio::test]
    async fn unhandled_type_is_ignored() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::new(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo, handler);
        let event = StripeEvent::for_test("payment_intent.created", serde_json::json!({}))
            .with_id("evt_other");

        assert_eq!(processor.process(event).await.unwrap(), WebhookResult::Ignored);
    }

    #[tokio::test]
    async fn failure_is_returned_and_recorded() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::failing(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo.clone(), handler);

        let result = processor.process(checkout_event("evt_fail")).await;

        assert!(matches!(result, Err(WebhookError::Database(_))));
        assert_eq!(repo.result_of("evt_fail").await, Some(WebhookEventResult::Failed));
    }

    #[tokio::test]
    async fn failed_event_is_retried_on_redelivery() {
        let repo = Arc::new(MockWebhookRepository::default());
        let handler = Arc::new(MockHandler::failing(vec![StripeEventType::CheckoutSessionCompleted]));
        let processor = processor(repo.clone(), handler.clone());

        assert!(processor.process(checkout_event("evt_retry")).await.is_err());

        handler.fail.store(false, Ordering::SeqCst);
        let result = processor.process(checkout_event("evt_retry")).await.unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(handler.call_count(), 2);
        assert_eq!(repo.result_of("evt_retry").await, Some(WebhookEventResult::Success));
    }
}
