//! `customer.subscription.*` handler.
//!
//! Mirrors the provider's subscription state into the subscriptions table.
//! Deliveries can arrive out of order, so every change is tagged with the
//! event's `created` time:
//!
//! - `created` inserts the full row and never overwrites an existing one
//! - `updated` changes status, periods and the cancel flag unless the row
//!   already holds a newer event or is canceled; when no row exists yet it
//!   takes the `created` path
//! - `deleted` marks the row canceled; rows are never removed

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::billing::{
    PlanCatalog, SubscriptionRecord, SubscriptionStateUpdate, SubscriptionStatus,
};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::webhook::{
    StripeEvent, StripeEventType, SubscriptionObject, WebhookError, WebhookEventHandler,
    METADATA_USER_ID,
};
use crate::ports::{CustomerRepository, SaveResult, StateChange, SubscriptionRepository};

/// Plan name used when neither the catalog nor the price nickname names one.
const FALLBACK_PLAN_NAME: &str = "Pro";
const FALLBACK_INTERVAL: &str = "month";

pub struct SubscriptionLifecycleHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    customers: Arc<dyn CustomerRepository>,
    catalog: Arc<PlanCatalog>,
}

impl SubscriptionLifecycleHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        customers: Arc<dyn CustomerRepository>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            subscriptions,
            customers,
            catalog,
        }
    }

    /// Customer mapping first, then subscription metadata.
    async fn resolve_user(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<Option<UserId>, WebhookError> {
        if let Some(user_id) = self.customers.find_user_id(&subscription.customer).await? {
            return Ok(Some(user_id));
        }
        Ok(subscription
            .metadata_value(METADATA_USER_ID)
            .and_then(|id| UserId::new(id).ok()))
    }

    fn plan_name(&self, subscription: &SubscriptionObject) -> String {
        let price = subscription.first_price();
        price
            .and_then(|p| self.catalog.find_by_price_id(&p.id))
            .map(|plan| plan.name.clone())
            .or_else(|| price.and_then(|p| p.nickname.clone()))
            .unwrap_or_else(|| FALLBACK_PLAN_NAME.to_string())
    }

    async fn create(
        &self,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
    ) -> Result<(), WebhookError> {
        let Some(user_id) = self.resolve_user(subscription).await? else {
            tracing::warn!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                customer_id = %subscription.customer,
                "Subscription has no resolvable user"
            );
            return Err(WebhookError::Ignored(
                "No user id could be resolved".to_string(),
            ));
        };

        let state = state_update(event, subscription)?;
        let price = subscription.first_price();
        let record = SubscriptionRecord {
            id: SubscriptionId::new(),
            user_id: user_id.clone(),
            stripe_subscription_id: subscription.id.clone(),
            stripe_customer_id: subscription.customer.clone(),
            plan_name: self.plan_name(subscription),
            plan_price: price.and_then(|p| p.unit_amount).unwrap_or(0),
            plan_interval: price
                .and_then(|p| p.recurring.as_ref())
                .map(|r| r.interval.clone())
                .unwrap_or_else(|| FALLBACK_INTERVAL.to_string()),
            status: state.status,
            current_period_start: state.current_period_start,
            current_period_end: state.current_period_end,
            cancel_at_period_end: state.cancel_at_period_end,
            created_at: state.updated_at,
            updated_at: state.updated_at,
            last_event_at: state.event_at,
        };

        match self.subscriptions.create(&record).await? {
            SaveResult::Inserted => {
                tracing::info!(
                    event_id = %event.id,
                    user_id = %user_id,
                    subscription_id = %record.stripe_subscription_id,
                    plan_name = %record.plan_name,
                    status = %record.status,
                    "Subscription stored"
                );
                Ok(())
            }
            SaveResult::AlreadyExists => {
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %record.stripe_subscription_id,
                    "Subscription already stored, keeping existing row"
                );
                Err(WebhookError::Ignored(format!(
                    "Subscription {} already stored",
                    record.stripe_subscription_id
                )))
            }
        }
    }

    async fn update(
        &self,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
    ) -> Result<(), WebhookError> {
        let state = state_update(event, subscription)?;
        match self.subscriptions.update_state(&subscription.id, &state).await? {
            StateChange::Applied => {
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    status = %state.status,
                    cancel_at_period_end = state.cancel_at_period_end,
                    "Subscription updated"
                );
                Ok(())
            }
            StateChange::Skipped => {
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    status = %state.status,
                    "Stale or post-cancellation update skipped"
                );
                Err(WebhookError::Ignored(format!(
                    "Update for {} is older than the stored state",
                    subscription.id
                )))
            }
            StateChange::NotFound => {
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    "Update for unknown subscription, storing full row"
                );
                self.create(event, subscription).await
            }
        }
    }

    async fn delete(
        &self,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
    ) -> Result<(), WebhookError> {
        let event_at = emitted_at(event)?;
        if self
            .subscriptions
            .mark_canceled(&subscription.id, event_at, Timestamp::now())
            .await?
        {
            tracing::info!(
                event_id = %event.id,
                subscription_id = %subscription.id,
                "Subscription canceled"
            );
            Ok(())
        } else {
            Err(WebhookError::Ignored(format!(
                "No subscription row for {}",
                subscription.id
            )))
        }
    }
}

fn timestamp(secs: Option<i64>, field: &'static str) -> Result<Timestamp, WebhookError> {
    secs.ok_or(WebhookError::MissingField(field))
        .and_then(|s| {
            Timestamp::from_unix_secs(s)
                .ok_or_else(|| WebhookError::ParseError(format!("{} out of range", field)))
        })
}

fn emitted_at(event: &StripeEvent) -> Result<Timestamp, WebhookError> {
    timestamp(Some(event.created), "created")
}

fn state_update(
    event: &StripeEvent,
    subscription: &SubscriptionObject,
) -> Result<SubscriptionStateUpdate, WebhookError> {
    Ok(SubscriptionStateUpdate {
        status: SubscriptionStatus::parse(&subscription.status)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?,
        current_period_start: timestamp(subscription.period_start(), "current_period_start")?,
        current_period_end: timestamp(subscription.period_end(), "current_period_end")?,
        cancel_at_period_end: subscription.cancel_at_period_end,
        updated_at: Timestamp::now(),
        event_at: emitted_at(event)?,
    })
}

#[async_trait]
impl WebhookEventHandler for SubscriptionLifecycleHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![
            StripeEventType::CustomerSubscriptionCreated,
            StripeEventType::CustomerSubscriptionUpdated,
            StripeEventType::CustomerSubscriptionDeleted,
        ]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("Invalid subscription: {}", e)))?;

        match event.parsed_type() {
            StripeEventType::CustomerSubscriptionCreated => self.create(event, &subscription).await,
            StripeEventType::CustomerSubscriptionUpdated => self.update(event, &subscription).await,
            StripeEventType::CustomerSubscriptionDeleted => self.delete(event, &subscription).await,
            other => Err(WebhookError::Ignored(format!(
                "Unhandled event type: {}",
                other.as_str()
            ))),
        }
    }
}
