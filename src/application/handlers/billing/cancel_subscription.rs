//! CancelSubscriptionHandler - Command handler for scheduling cancellation.
//!
//! Cancellation takes effect at the end of the paid period. The local row
//! is flagged immediately; the provider confirms with a
//! `customer.subscription.updated` event and, at period end, a
//! `customer.subscription.deleted` event.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{PaymentProvider, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    /// Provider subscription id (`sub_...`).
    pub subscription_id: String,
}

/// The subscription row after cancellation was scheduled.
pub type CancelSubscriptionResult = SubscriptionRecord;

pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            subscriptions,
            provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(BillingError::validation(
                "subscription_id",
                "Subscription ID is required",
            ));
        }

        // Another user's subscription is reported as missing.
        let mut subscription = self
            .subscriptions
            .find_by_stripe_id(subscription_id)
            .await?
            .filter(|s| s.user_id == cmd.user_id)
            .ok_or_else(|| BillingError::SubscriptionNotFound(subscription_id.to_string()))?;

        if subscription.status == SubscriptionStatus::Canceled {
            return Err(BillingError::validation(
                "subscription_id",
                "Subscription is already canceled",
            ));
        }
        if subscription.cancel_at_period_end {
            return Ok(subscription);
        }

        self.provider
            .cancel_subscription_at_period_end(subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Cancellation request failed"
                );
                BillingError::from(e)
            })?;

        // Only the flag is written. A webhook may have changed status or
        // periods while the provider call was in flight.
        let now = Timestamp::now();
        self.subscriptions
            .set_cancel_at_period_end(subscription_id, true, now)
            .await?;
        subscription.cancel_at_period_end = true;
        subscription.updated_at = now;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            period_end = %subscription.current_period_end,
            "Subscription cancellation scheduled"
        );

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::subscription::test_support::SubscriptionRecordBuilder;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::billing::SubscriptionStateUpdate;
    use crate::ports::{
        CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    };

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        provider: Arc<MockPaymentProvider>,
        handler: CancelSubscriptionHandler,
    }

    async fn fixture_with(subscription: SubscriptionRecord) -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        store.create(&subscription).await.unwrap();
        let provider = Arc::new(MockPaymentProvider::new());
        let handler = CancelSubscriptionHandler::new(store.clone(), provider.clone());
        Fixture {
            store,
            provider,
            handler,
        }
    }

    fn command(user: &str, subscription_id: &str) -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            user_id: UserId::new(user).unwrap(),
            subscription_id: subscription_id.to_string(),
        }
    }

    #[tokio::test]
    async fn schedules_cancellation_and_flags_row() {
        let f = fixture_with(SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build()).await;

        let result = f.handler.handle(command("u1", "sub_1")).await.unwrap();

        assert!(result.cancel_at_period_end);
        assert_eq!(result.status, SubscriptionStatus::Active);
        assert_eq!(f.provider.call_count("cancel_subscription_at_period_end"), 1);
        let stored = f.store.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert!(stored.cancel_at_period_end);
    }

    #[tokio::test]
    async fn other_users_subscription_is_not_found() {
        let f = fixture_with(SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build()).await;

        let err = f.handler.handle(command("u2", "sub_1")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn already_scheduled_is_a_no_op() {
        let mut subscription = SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build();
        subscription.cancel_at_period_end = true;
        let f = fixture_with(subscription).await;

        let result = f.handler.handle(command("u1", "sub_1")).await.unwrap();

        assert!(result.cancel_at_period_end);
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn canceled_subscription_is_rejected() {
        let f = fixture_with(
            SubscriptionRecordBuilder::new("u1")
                .stripe_id("sub_1")
                .status(SubscriptionStatus::Canceled)
                .build(),
        )
        .await;

        let err = f.handler.handle(command("u1", "sub_1")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn provider_failure_leaves_row_untouched() {
        let f = fixture_with(SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build()).await;
        f.provider.set_method_error(
            "cancel_subscription_at_period_end",
            PaymentError::not_found("subscription"),
        );

        let err = f.handler.handle(command("u1", "sub_1")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::PaymentProviderError);
        let stored = f.store.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert!(!stored.cancel_at_period_end);
    }

    /// Provider whose cancel call lands while a webhook rewrites the row.
    struct WebhookDuringCancel {
        store: Arc<InMemoryBillingStore>,
        update: SubscriptionStateUpdate,
    }

    #[async_trait::async_trait]
    impl PaymentProvider for WebhookDuringCancel {
        async fn create_customer(
            &self,
            _request: CreateCustomerRequest,
        ) -> Result<Customer, PaymentError> {
            Err(PaymentError::not_found("customer"))
        }

        async fn create_checkout_session(
            &self,
            _request: CreateCheckoutRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            Err(PaymentError::not_found("session"))
        }

        async fn cancel_subscription_at_period_end(
            &self,
            stripe_subscription_id: &str,
        ) -> Result<(), PaymentError> {
            self.store
                .update_state(stripe_subscription_id, &self.update)
                .await
                .unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn state_written_during_provider_call_is_kept() {
        let store = Arc::new(InMemoryBillingStore::new());
        let original = SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build();
        store.create(&original).await.unwrap();

        let renewed_end = original.current_period_end.add_days(30);
        let update = SubscriptionStateUpdate {
            status: SubscriptionStatus::PastDue,
            current_period_start: original.current_period_end,
            current_period_end: renewed_end,
            cancel_at_period_end: false,
            updated_at: Timestamp::now(),
            event_at: Timestamp::now(),
        };
        let provider = Arc::new(WebhookDuringCancel {
            store: store.clone(),
            update,
        });
        let handler = CancelSubscriptionHandler::new(store.clone(), provider);

        handler.handle(command("u1", "sub_1")).await.unwrap();

        let stored = store.find_by_stripe_id("sub_1").await.unwrap().unwrap();
        assert!(stored.cancel_at_period_end);
        assert_eq!(stored.status, SubscriptionStatus::PastDue);
        assert_eq!(stored.current_period_end, renewed_end);
    }
}
