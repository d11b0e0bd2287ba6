//! `checkout.session.completed` handler.
//!
//! Writes one payment row per one-time checkout session. The row is keyed
//! by the session id, so a redelivered event never creates a second row.
//! Subscription and setup checkouts only store the customer mapping; the
//! subscription itself arrives through `customer.subscription.*`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::billing::{PaymentStatus, PurchaseRecord, UNKNOWN_PRODUCT};
use crate::domain::foundation::{PurchaseId, Timestamp, UserId};
use crate::domain::webhook::{
    CheckoutSessionObject, StripeEvent, StripeEventType, WebhookError, WebhookEventHandler,
    METADATA_PRODUCT_NAME, METADATA_USER_ID,
};
use crate::ports::{CustomerRepository, PaymentRepository, SaveResult};

pub struct CheckoutCompletedHandler {
    payments: Arc<dyn PaymentRepository>,
    customers: Arc<dyn CustomerRepository>,
}

impl CheckoutCompletedHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            payments,
            customers,
        }
    }

    /// Metadata first, then the stored customer mapping.
    async fn resolve_user(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<Option<UserId>, WebhookError> {
        if let Some(user_id) = session
            .metadata_value(METADATA_USER_ID)
            .and_then(|id| UserId::new(id).ok())
        {
            return Ok(Some(user_id));
        }
        match &session.customer {
            Some(customer) => Ok(self.customers.find_user_id(customer).await?),
            None => Ok(None),
        }
    }

    async fn record_payment(
        &self,
        event: &StripeEvent,
        session: &CheckoutSessionObject,
        user_id: &UserId,
    ) -> Result<(), WebhookError> {
        let record = PurchaseRecord {
            id: PurchaseId::new(),
            user_id: user_id.clone(),
            product_name: session
                .metadata_value(METADATA_PRODUCT_NAME)
                .unwrap_or(UNKNOWN_PRODUCT)
                .to_string(),
            amount: session.amount_total.unwrap_or(0),
            currency: session
                .currency
                .clone()
                .unwrap_or_else(|| "usd".to_string()),
            status: payment_status(session),
            stripe_session_id: session.id.clone(),
            stripe_payment_intent_id: session.payment_intent.clone(),
            created_at: Timestamp::from_unix_secs(event.created).unwrap_or_else(Timestamp::now),
        };

        match self.payments.insert(&record).await? {
            SaveResult::Inserted => tracing::info!(
                event_id = %event.id,
                user_id = %user_id,
                product_name = %record.product_name,
                amount = record.amount,
                status = %record.status,
                "Payment recorded"
            ),
            SaveResult::AlreadyExists => tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                "Payment for checkout session already recorded"
            ),
        }

        Ok(())
    }
}

fn payment_status(session: &CheckoutSessionObject) -> PaymentStatus {
    PaymentStatus::from_checkout_payment_status(&session.payment_status).unwrap_or_else(|| {
        tracing::warn!(
            session_id = %session.id,
            payment_status = %session.payment_status,
            "Unrecognised checkout payment status, storing as unpaid"
        );
        PaymentStatus::Unpaid
    })
}

#[async_trait]
impl WebhookEventHandler for CheckoutCompletedHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![StripeEventType::CheckoutSessionCompleted]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        let session: CheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("Invalid checkout session: {}", e)))?;

        let Some(user_id) = self.resolve_user(&session).await? else {
            tracing::warn!(
                event_id = %event.id,
                session_id = %session.id,
                "Checkout session has no resolvable user"
            );
            return Err(WebhookError::Ignored(
                "No user id could be resolved".to_string(),
            ));
        };

        if session.is_one_time_payment() {
            self.record_payment(event, &session, &user_id).await?;
        } else {
            tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                mode = session.mode.as_deref().unwrap_or_default(),
                "Non-payment checkout, no payment row written"
            );
        }

        if let Some(customer) = &session.customer {
            if self.customers.save(&user_id, customer).await? == SaveResult::Inserted {
                tracing::debug!(user_id = %user_id, customer_id = %customer, "Customer mapping stored");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use serde_json::json;

    fn handler(store: &Arc<InMemoryBillingStore>) -> CheckoutCompletedHandler {
        CheckoutCompletedHandler::new(store.clone(), store.clone())
    }

    fn event(object: serde_json::Value) -> StripeEvent {
        StripeEvent::for_test("checkout.session.completed", object).with_id("evt_checkout_1")
    }

    fn paid_session() -> serde_json::Value {
        json!({
            "id": "cs_test_1",
            "customer": "cus_1",
            "payment_intent": "pi_1",
            "amount_total": 2900,
            "currency": "usd",
            "payment_status": "paid",
            "mode": "payment",
            "metadata": {"user_id": "user-1", "product_name": "Starter Kit"}
        })
    }

    #[tokio::test]
    async fn paid_session_records_succeeded_payment() {
        let store = Arc::new(InMemoryBillingStore::new());

        handler(&store).handle(&event(paid_session())).await.unwrap();

        let payments = store.payments().await;
        assert_eq!(payments.len(), 1);
        let p = &payments[0];
        assert_eq!(p.user_id.as_str(), "user-1");
        assert_eq!(p.product_name, "Starter Kit");
        assert_eq!(p.amount, 2900);
        assert_eq!(p.status, PaymentStatus::Succeeded);
        assert_eq!(p.stripe_session_id, "cs_test_1");
        assert_eq!(p.stripe_payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn missing_fields_fall_back_to_defaults() {
        let store = Arc::new(InMemoryBillingStore::new());
        let object = json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "metadata": {"user_id": "user-1"}
        });

        handler(&store).handle(&event(object)).await.unwrap();

        let p = &store.payments().await[0];
        assert_eq!(p.product_name, UNKNOWN_PRODUCT);
        assert_eq!(p.amount, 0);
        assert_eq!(p.currency, "usd");
        assert_eq!(p.status, PaymentStatus::Unpaid);
    }

    fn subscription_session() -> serde_json::Value {
        json!({
            "id": "cs_sub_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "amount_total": 2900,
            "currency": "usd",
            "payment_status": "paid",
            "mode": "subscription",
            "metadata": {"user_id": "user-1", "product_name": "Pro"}
        })
    }

    #[tokio::test]
    async fn subscription_checkout_writes_no_payment_row() {
        let store = Arc::new(InMemoryBillingStore::new());

        handler(&store).handle(&event(subscription_session())).await.unwrap();

        assert!(store.payments().await.is_empty());
        assert_eq!(
            store.find_user_id("cus_1").await.unwrap(),
            Some(UserId::new("user-1").unwrap())
        );
    }

    #[tokio::test]
    async fn subscription_checkout_leaves_one_time_plan_purchasable() {
        use crate::application::handlers::billing::{
            CheckPurchaseEligibilityHandler, CheckPurchaseEligibilityQuery,
        };

        let store = Arc::new(InMemoryBillingStore::new());
        handler(&store).handle(&event(subscription_session())).await.unwrap();

        let verdict = CheckPurchaseEligibilityHandler::new(store.clone(), store.clone())
            .handle(CheckPurchaseEligibilityQuery {
                user_id: Some(UserId::new("user-1").unwrap()),
                plan_name: "Pro".to_string(),
                is_subscription: false,
            })
            .await;

        assert!(verdict.allowed);
    }

    #[tokio::test]
    async fn setup_checkout_writes_no_payment_row() {
        let store = Arc::new(InMemoryBillingStore::new());
        let mut object = subscription_session();
        object["mode"] = json!("setup");
        object["payment_status"] = json!("no_payment_required");

        handler(&store).handle(&event(object)).await.unwrap();

        assert!(store.payments().await.is_empty());
    }

    #[tokio::test]
    async fn same_session_twice_yields_one_row() {
        let store = Arc::new(InMemoryBillingStore::new());
        let h = handler(&store);

        h.handle(&event(paid_session())).await.unwrap();
        h.handle(&event(paid_session())).await.unwrap();

        assert_eq!(store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn user_is_resolved_through_customer_mapping() {
        let store = Arc::new(InMemoryBillingStore::new());
        CustomerRepository::save(store.as_ref(), &UserId::new("user-9").unwrap(), "cus_9")
            .await
            .unwrap();
        let object = json!({
            "id": "cs_test_3",
            "customer": "cus_9",
            "payment_status": "paid",
            "metadata": {}
        });

        handler(&store).handle(&event(object)).await.unwrap();

        assert_eq!(store.payments().await[0].user_id.as_str(), "user-9");
    }

    #[tokio::test]
    async fn customer_mapping_is_stored_when_missing() {
        let store = Arc::new(InMemoryBillingStore::new());

        handler(&store).handle(&event(paid_session())).await.unwrap();

        assert_eq!(
            store.find_user_id("cus_1").await.unwrap(),
            Some(UserId::new("user-1").unwrap())
        );
    }

    #[tokio::test]
    async fn unresolvable_user_is_ignored_without_rows() {
        let store = Arc::new(InMemoryBillingStore::new());
        let object = json!({
            "id": "cs_test_4",
            "customer": "cus_unknown",
            "payment_status": "paid",
            "metadata": {"user_id": ""}
        });

        let result = handler(&store).handle(&event(object)).await;

        assert!(matches!(result, Err(WebhookError::Ignored(_))));
        assert!(store.payments().await.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_a_database_error() {
        let store = Arc::new(InMemoryBillingStore::new());
        store.set_unavailable(true);

        let result = handler(&store).handle(&event(paid_session())).await;

        assert!(matches!(result, Err(WebhookError::Database(_))));
    }

    #[tokio::test]
    async fn malformed_object_is_a_parse_error() {
        let store = Arc::new(InMemoryBillingStore::new());

        let result = handler(&store).handle(&event(json!({"nope": true}))).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }
}
