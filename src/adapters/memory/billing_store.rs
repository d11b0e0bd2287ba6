//! In-memory billing store.
//!
//! Implements every persistence port over process memory, with the same
//! unique-key semantics as the Postgres schema. Used by tests and by local
//! runs without a database. Data does not survive a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::billing::{
    PurchaseRecord, SubscriptionRecord, SubscriptionStateUpdate, SubscriptionStatus,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{
    CustomerRepository, PaymentRepository, SaveResult, StateChange, SubscriptionRepository,
    WebhookEventRecord, WebhookEventRepository,
};

#[derive(Default)]
pub struct InMemoryBillingStore {
    payments: RwLock<Vec<PurchaseRecord>>,
    subscriptions: RwLock<Vec<SubscriptionRecord>>,
    customers: RwLock<Vec<(UserId, String)>>,
    webhook_events: RwLock<HashMap<String, WebhookEventRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("in-memory store unavailable"));
        }
        Ok(())
    }

    pub async fn payments(&self) -> Vec<PurchaseRecord> {
        self.payments.read().await.clone()
    }

    pub async fn subscriptions(&self) -> Vec<SubscriptionRecord> {
        self.subscriptions.read().await.clone()
    }

    pub async fn webhook_event(&self, event_id: &str) -> Option<WebhookEventRecord> {
        self.webhook_events.read().await.get(event_id).cloned()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> Timestamp,
{
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn insert(&self, payment: &PurchaseRecord) -> Result<SaveResult, DomainError> {
        self.check_available()?;
        let mut payments = self.payments.write().await;
        if payments
            .iter()
            .any(|p| p.stripe_session_id == payment.stripe_session_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        payments.push(payment.clone());
        Ok(SaveResult::Inserted)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PurchaseRecord>, DomainError> {
        self.check_available()?;
        let rows = self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| p.created_at))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn create(&self, subscription: &SubscriptionRecord) -> Result<SaveResult, DomainError> {
        self.check_available()?;
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions
            .iter()
            .any(|s| s.stripe_subscription_id == subscription.stripe_subscription_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        subscriptions.push(subscription.clone());
        Ok(SaveResult::Inserted)
    }

    async fn update_state(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStateUpdate,
    ) -> Result<StateChange, DomainError> {
        self.check_available()?;
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
        {
            Some(existing) if existing.accepts(update) => {
                existing.apply(update);
                Ok(StateChange::Applied)
            }
            Some(_) => Ok(StateChange::Skipped),
            None => Ok(StateChange::NotFound),
        }
    }

    async fn mark_canceled(
        &self,
        stripe_subscription_id: &str,
        event_at: Timestamp,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
        {
            Some(existing) => {
                existing.status = SubscriptionStatus::Canceled;
                existing.updated_at = updated_at;
                existing.last_event_at = existing.last_event_at.max(event_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_cancel_at_period_end(
        &self,
        stripe_subscription_id: &str,
        cancel_at_period_end: bool,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
        {
            Some(existing) => {
                existing.cancel_at_period_end = cancel_at_period_end;
                existing.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.check_available()?;
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        self.check_available()?;
        let rows = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |s| s.created_at))
    }
}

#[async_trait]
impl CustomerRepository for InMemoryBillingStore {
    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        self.check_available()?;
        Ok(self
            .customers
            .read()
            .await
            .iter()
            .find(|(user, _)| user == user_id)
            .map(|(_, customer)| customer.clone()))
    }

    async fn find_user_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        self.check_available()?;
        Ok(self
            .customers
            .read()
            .await
            .iter()
            .find(|(_, customer)| customer == stripe_customer_id)
            .map(|(user, _)| user.clone()))
    }

    async fn save(
        &self,
        user_id: &UserId,
        stripe_customer_id: &str,
    ) -> Result<SaveResult, DomainError> {
        self.check_available()?;
        let mut customers = self.customers.write().await;
        if customers
            .iter()
            .any(|(user, customer)| user == user_id || customer == stripe_customer_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        customers.push((user_id.clone(), stripe_customer_id.to_string()));
        Ok(SaveResult::Inserted)
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryBillingStore {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        self.check_available()?;
        Ok(self.webhook_events.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        self.check_available()?;
        let mut events = self.webhook_events.write().await;
        match events.get(&record.event_id) {
            Some(existing) if existing.result.is_final() => Ok(SaveResult::AlreadyExists),
            _ => {
                events.insert(record.event_id.clone(), record);
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        self.check_available()?;
        let mut events = self.webhook_events.write().await;
        let before = events.len();
        events.retain(|_, r| r.processed_at >= timestamp);
        Ok((before - events.len()) as u64)
    }
}
