//! Routes verified Stripe events to the billing handlers.

use std::sync::Arc;

use super::{CheckoutCompletedHandler, SubscriptionLifecycleHandler};
use crate::domain::billing::PlanCatalog;
use crate::domain::webhook::{StripeEventType, WebhookDispatcher, WebhookEventHandler};
use crate::ports::{CustomerRepository, PaymentRepository, SubscriptionRepository};

/// Dispatcher over a fixed handler list; first handler claiming a type wins.
pub struct BillingWebhookDispatcher {
    handlers: Vec<Box<dyn WebhookEventHandler>>,
}

impl BillingWebhookDispatcher {
    pub fn new(handlers: Vec<Box<dyn WebhookEventHandler>>) -> Self {
        Self { handlers }
    }

    /// The standard handler set for checkout and subscription events.
    pub fn standard(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        customers: Arc<dyn CustomerRepository>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self::new(vec![
            Box::new(CheckoutCompletedHandler::new(payments, customers.clone())),
            Box::new(SubscriptionLifecycleHandler::new(
                subscriptions,
                customers,
                catalog,
            )),
        ])
    }
}

impl WebhookDispatcher for BillingWebhookDispatcher {
    fn get_handler(&self, event_type: &StripeEventType) -> Option<&dyn WebhookEventHandler> {
        self.handlers
            .iter()
            .find(|h| h.handles().contains(event_type))
            .map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::webhook::{StripeEvent, WebhookError};

    fn dispatcher() -> BillingWebhookDispatcher {
        let store = Arc::new(InMemoryBillingStore::new());
        BillingWebhookDispatcher::standard(
            store.clone(),
            store.clone(),
            store,
            Arc::new(PlanCatalog::standard()),
        )
    }

    #[test]
    fn every_handled_type_has_a_handler() {
        let d = dispatcher();
        for event_type in [
            StripeEventType::CheckoutSessionCompleted,
            StripeEventType::CustomerSubscriptionCreated,
            StripeEventType::CustomerSubscriptionUpdated,
            StripeEventType::CustomerSubscriptionDeleted,
        ] {
            assert!(d.get_handler(&event_type).is_some(), "{:?}", event_type);
        }
        assert!(d.get_handler(&StripeEventType::Unknown).is_none());
    }

    #[tokio::test]
    async fn unhandled_type_is_ignored() {
        let event = StripeEvent::for_test("invoice.payment_failed", serde_json::json!({}));

        let result = dispatcher().dispatch(&event).await;

        match result {
            Err(WebhookError::Ignored(reason)) => {
                assert_eq!(reason, "Unhandled event type: invoice.payment_failed")
            }
            other => panic!("expected ignored, got {:?}", other),
        }
    }
}
