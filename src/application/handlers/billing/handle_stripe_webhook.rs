//! HandleStripeWebhookHandler - Command handler for signed Stripe deliveries.
//!
//! Verification happens before anything is parsed or stored. A verified
//! event then goes through the idempotent processor, which logs the outcome
//! per event id.

use std::sync::Arc;

use crate::application::handlers::webhook::BillingWebhookDispatcher;
use crate::domain::billing::PlanCatalog;
use crate::domain::webhook::{IdempotentWebhookProcessor, StripeWebhookVerifier, WebhookError};
use crate::ports::{
    CustomerRepository, PaymentRepository, SubscriptionRepository, WebhookEventRepository,
    WebhookResult,
};

/// Raw delivery as received over HTTP.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    pub payload: Vec<u8>,
    /// Value of the `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

pub type HandleStripeWebhookResult = WebhookResult;

pub struct HandleStripeWebhookHandler {
    verifier: StripeWebhookVerifier,
    processor: IdempotentWebhookProcessor<BillingWebhookDispatcher>,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        verifier: StripeWebhookVerifier,
        processor: IdempotentWebhookProcessor<BillingWebhookDispatcher>,
    ) -> Self {
        Self {
            verifier,
            processor,
        }
    }

    /// Wires the standard dispatcher over the given repositories.
    pub fn with_repositories(
        verifier: StripeWebhookVerifier,
        events: Arc<dyn WebhookEventRepository>,
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        customers: Arc<dyn CustomerRepository>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        let dispatcher =
            BillingWebhookDispatcher::standard(payments, subscriptions, customers, catalog);
        Self::new(verifier, IdempotentWebhookProcessor::new(events, dispatcher))
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<HandleStripeWebhookResult, WebhookError> {
        let signature = cmd.signature.ok_or_else(|| {
            tracing::warn!("Webhook delivery without Stripe-Signature header");
            WebhookError::MissingSignature
        })?;

        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Webhook verification failed");
                e
            })?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Webhook event received"
        );

        let event_id = event.id.clone();
        let result = self.processor.process(event).await;
        match &result {
            Ok(outcome) => {
                tracing::info!(event_id = %event_id, outcome = outcome.as_str(), "Webhook event handled")
            }
            Err(e) => {
                tracing::error!(event_id = %event_id, error = %e, "Webhook event processing failed")
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{PaymentStatus, SubscriptionStatus};
    use crate::domain::foundation::UserId;
    use crate::domain::webhook::compute_test_signature;
    use crate::ports::WebhookEventResult;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    fn handler(store: &Arc<InMemoryBillingStore>) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::with_repositories(
            StripeWebhookVerifier::new(SECRET),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(PlanCatalog::standard()),
        )
    }

    fn signed(payload: &serde_json::Value) -> HandleStripeWebhookCommand {
        let body = payload.to_string();
        let ts = chrono::Utc::now().timestamp();
        let sig = compute_test_signature(SECRET, ts, &body);
        HandleStripeWebhookCommand {
            payload: body.into_bytes(),
            signature: Some(format!("t={},v1={}", ts, sig)),
        }
    }

    fn checkout_event(event_id: &str, session_id: &str) -> serde_json::Value {
        json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "created": chrono::Utc::now().timestamp(),
            "livemode": false,
            "data": {"object": {
                "id": session_id,
                "customer": "cus_1",
                "amount_total": 9900,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": {"user_id": "user-1", "product_name": "Pro"}
            }}
        })
    }

    fn subscription_event(event_id: &str, event_type: &str, status: &str) -> serde_json::Value {
        let start = chrono::Utc::now().timestamp();
        json!({
            "id": event_id,
            "type": event_type,
            "created": start,
            "data": {"object": {
                "id": "sub_1",
                "customer": "cus_1",
                "status": status,
                "current_period_start": start,
                "current_period_end": start + 30 * 86_400,
                "metadata": {"user_id": "user-1"},
                "items": {"data": [{"price": {
                    "id": "price_sub_pro_monthly",
                    "unit_amount": 2900,
                    "recurring": {"interval": "month"}
                }}]}
            }}
        })
    }

    #[tokio::test]
    async fn redelivered_checkout_event_writes_one_row() {
        let store = Arc::new(InMemoryBillingStore::new());
        let h = handler(&store);
        let payload = checkout_event("evt_1", "cs_1");

        let first = h.handle(signed(&payload)).await.unwrap();
        let second = h.handle(signed(&payload)).await.unwrap();

        assert_eq!(first, WebhookResult::Processed);
        assert_eq!(second, WebhookResult::AlreadyProcessed);
        let payments = store.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
        assert_eq!(
            store.webhook_event("evt_1").await.unwrap().result,
            WebhookEventResult::Success
        );
    }

    #[tokio::test]
    async fn distinct_events_for_same_session_still_write_one_row() {
        let store = Arc::new(InMemoryBillingStore::new());
        let h = handler(&store);

        h.handle(signed(&checkout_event("evt_1", "cs_1"))).await.unwrap();
        h.handle(signed(&checkout_event("evt_2", "cs_1"))).await.unwrap();

        assert_eq!(store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected_before_parsing() {
        let store = Arc::new(InMemoryBillingStore::new());
        let mut cmd = signed(&checkout_event("evt_1", "cs_1"));
        cmd.signature = None;

        let err = handler(&store).handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::MissingSignature));
        assert_eq!(err.to_string(), "No signature found");
        assert!(store.payments().await.is_empty());
        assert!(store.webhook_event("evt_1").await.is_none());
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let store = Arc::new(InMemoryBillingStore::new());
        let mut cmd = signed(&checkout_event("evt_1", "cs_1"));
        cmd.payload = checkout_event("evt_1", "cs_forged").to_string().into_bytes();

        let err = handler(&store).handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert!(store.payments().await.is_empty());
    }

    #[tokio::test]
    async fn storage_outage_fails_and_is_retried_on_redelivery() {
        let store = Arc::new(InMemoryBillingStore::new());
        let h = handler(&store);
        let payload = checkout_event("evt_1", "cs_1");

        store.set_unavailable(true);
        let err = h.handle(signed(&payload)).await.unwrap_err();
        assert!(err.is_retryable());

        store.set_unavailable(false);
        let retried = h.handle(signed(&payload)).await.unwrap();

        assert_eq!(retried, WebhookResult::Processed);
        assert_eq!(store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_acknowledged() {
        let store = Arc::new(InMemoryBillingStore::new());
        let payload = json!({
            "id": "evt_invoice",
            "type": "invoice.paid",
            "created": chrono::Utc::now().timestamp(),
            "data": {"object": {"id": "in_1"}}
        });

        let result = handler(&store).handle(signed(&payload)).await.unwrap();

        assert_eq!(result, WebhookResult::Ignored);
        assert_eq!(
            store.webhook_event("evt_invoice").await.unwrap().result,
            WebhookEventResult::Ignored
        );
    }

    #[tokio::test]
    async fn subscription_lifecycle_ends_canceled() {
        let store = Arc::new(InMemoryBillingStore::new());
        let h = handler(&store);

        h.handle(signed(&subscription_event("evt_c", "customer.subscription.created", "active")))
            .await
            .unwrap();
        h.handle(signed(&subscription_event("evt_u", "customer.subscription.updated", "past_due")))
            .await
            .unwrap();
        h.handle(signed(&subscription_event("evt_d", "customer.subscription.deleted", "canceled")))
            .await
            .unwrap();

        let rows = store.subscriptions().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, UserId::new("user-1").unwrap());
        assert_eq!(rows[0].status, SubscriptionStatus::Canceled);
    }
}
