//! Subscription repository port.
//!
//! Mirrors provider subscriptions keyed by `stripe_subscription_id`. Rows
//! are never deleted; cancellation only changes the status.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::billing::{SubscriptionRecord, SubscriptionStateUpdate};
use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// Outcome of `update_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Applied,
    /// The row exists but refused the change (stale event, or the row is
    /// already canceled). See `SubscriptionRecord::accepts`.
    Skipped,
    NotFound,
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a row unless one with the same `stripe_subscription_id`
    /// exists. An existing row is left untouched.
    async fn create(&self, subscription: &SubscriptionRecord) -> Result<SaveResult, DomainError>;

    /// Apply a provider state change if the stored row accepts it.
    async fn update_state(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStateUpdate,
    ) -> Result<StateChange, DomainError>;

    /// Set status `canceled`, whatever the stored state. Returns `false`
    /// when no row matches.
    async fn mark_canceled(
        &self,
        stripe_subscription_id: &str,
        event_at: Timestamp,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Set only the cancel flag. Status and periods stay as the provider
    /// last reported them.
    async fn set_cancel_at_period_end(
        &self,
        stripe_subscription_id: &str,
        cancel_at_period_end: bool,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError>;

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// All subscriptions of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId)
        -> Result<Vec<SubscriptionRecord>, DomainError>;
}
