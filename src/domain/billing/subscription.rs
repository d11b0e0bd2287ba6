//! Recurring subscription records.
//!
//! Status changes are driven entirely by provider webhooks; nothing in the
//! application moves a subscription between states on its own.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId, ValidationError};

/// Subscription status as reported by Stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Parses a provider or stored status value.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "incomplete_expired" => Ok(SubscriptionStatus::IncompleteExpired),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "paused" => Ok(SubscriptionStatus::Paused),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown value '{}'", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A subscription row mirrored from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub user_id: UserId,
    /// Provider subscription id (`sub_...`), unique per row.
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub plan_name: String,
    /// Unit price in minor units.
    pub plan_price: i64,
    /// Billing interval as reported by the provider (`month`, `year`, ...).
    pub plan_interval: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Emission time of the newest provider event applied to this row.
    pub last_event_at: Timestamp,
}

impl SubscriptionRecord {
    /// Active means status `active` and a period end strictly after `now`.
    ///
    /// A row whose period has lapsed does not count even when the provider
    /// has not yet sent the status change.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.current_period_end.is_after(&now)
    }

    /// Whether a provider state change may overwrite this row.
    ///
    /// Events emitted before the last applied one are stale, and a canceled
    /// row only accepts another cancellation.
    pub fn accepts(&self, update: &SubscriptionStateUpdate) -> bool {
        if update.event_at < self.last_event_at {
            return false;
        }
        self.status != SubscriptionStatus::Canceled
            || update.status == SubscriptionStatus::Canceled
    }

    /// Applies a provider state change to this row.
    pub fn apply(&mut self, update: &SubscriptionStateUpdate) {
        self.status = update.status;
        self.current_period_start = update.current_period_start;
        self.current_period_end = update.current_period_end;
        self.cancel_at_period_end = update.cancel_at_period_end;
        self.updated_at = update.updated_at;
        self.last_event_at = update.event_at;
    }
}

/// Fields a `customer.subscription.updated` event may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionStateUpdate {
    pub status: SubscriptionStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
    pub updated_at: Timestamp,
    /// `created` of the event carrying the change.
    pub event_at: Timestamp,
}


#[cfg(test)]
mod tests {
    use super::test_support::SubscriptionRecordBuilder;
    use super::*;

    #[test]
    fn parse_accepts_provider_values() {
        assert_eq!(SubscriptionStatus::parse("past_due").unwrap(), SubscriptionStatus::PastDue);
        assert_eq!(SubscriptionStatus::parse("canceled").unwrap(), SubscriptionStatus::Canceled);
        assert!(SubscriptionStatus::parse("cancelled").is_err());
    }

    #[test]
    fn active_row_with_future_period_end_is_active() {
        let now = Timestamp::now();
        let sub = SubscriptionRecordBuilder::new("u1").period_end(now.add_days(1)).build();
        assert!(sub.is_active_at(now));
    }

    #[test]
    fn lapsed_period_is_not_active_even_with_active_status() {
        let now = Timestamp::now();
        let sub = SubscriptionRecordBuilder::new("u1").period_end(now.add_days(-1)).build();
        assert!(!sub.is_active_at(now));
    }

    #[test]
    fn period_ending_exactly_now_is_not_active() {
        let now = Timestamp::now();
        let sub = SubscriptionRecordBuilder::new("u1").period_end(now).build();
        assert!(!sub.is_active_at(now));
    }

    #[test]
    fn past_due_is_not_active() {
        let sub = SubscriptionRecordBuilder::new("u1")
            .status(SubscriptionStatus::PastDue)
            .build();
        assert!(!sub.is_active_at(Timestamp::now()));
    }

    fn change(status: SubscriptionStatus, event_at: Timestamp) -> SubscriptionStateUpdate {
        SubscriptionStateUpdate {
            status,
            current_period_start: Timestamp::now(),
            current_period_end: Timestamp::now().add_days(60),
            cancel_at_period_end: true,
            updated_at: Timestamp::now(),
            event_at,
        }
    }

    #[test]
    fn apply_overwrites_mutable_fields_only() {
        let mut sub = SubscriptionRecordBuilder::new("u1").stripe_id("sub_1").build();
        let update = change(SubscriptionStatus::PastDue, Timestamp::now());
        sub.apply(&update);

        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.current_period_end, update.current_period_end);
        assert_eq!(sub.last_event_at, update.event_at);
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.stripe_subscription_id, "sub_1");
        assert_eq!(sub.plan_name, "Pro");
    }

    #[test]
    fn older_event_is_not_accepted() {
        let now = Timestamp::now();
        let sub = SubscriptionRecordBuilder::new("u1").last_event_at(now).build();

        assert!(!sub.accepts(&change(SubscriptionStatus::PastDue, now.add_days(-1))));
        assert!(sub.accepts(&change(SubscriptionStatus::PastDue, now)));
    }

    #[test]
    fn canceled_row_is_never_reactivated() {
        let now = Timestamp::now();
        let sub = SubscriptionRecordBuilder::new("u1")
            .status(SubscriptionStatus::Canceled)
            .last_event_at(now.add_days(-1))
            .build();

        assert!(!sub.accepts(&change(SubscriptionStatus::Active, now)));
        assert!(sub.accepts(&change(SubscriptionStatus::Canceled, now)));
    }
}
