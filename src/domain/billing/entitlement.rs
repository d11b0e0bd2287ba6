//! Entitlement checks over a user's purchase and subscription rows.
//!
//! Answers two questions: does the user already hold a product or an active
//! subscription, and may the user buy a given plan. Everything here is a pure
//! predicate over rows that were fetched elsewhere; there are no proration,
//! upgrade or downgrade rules. Plan switches go through the provider's
//! checkout.

use serde::Serialize;

use super::{PurchaseRecord, SubscriptionRecord};
use crate::domain::foundation::Timestamp;

/// Why a purchase was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No session, so there are no rows to check against.
    NotLoggedIn,
    /// An active subscription to the same plan exists.
    AlreadySubscribedToPlan,
    /// A different subscription is still active.
    OtherSubscriptionActive,
    /// The one-time product was already bought.
    AlreadyPurchased,
    /// The user's rows could not be loaded.
    LookupFailed,
}

impl DenialReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::NotLoggedIn => "not_logged_in",
            DenialReason::AlreadySubscribedToPlan => "already_subscribed_to_plan",
            DenialReason::OtherSubscriptionActive => "other_subscription_active",
            DenialReason::AlreadyPurchased => "already_purchased",
            DenialReason::LookupFailed => "lookup_failed",
        }
    }

    /// Message suitable for showing to the user.
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::NotLoggedIn => "Please sign in to make a purchase",
            DenialReason::AlreadySubscribedToPlan => "You are already subscribed to this plan",
            DenialReason::OtherSubscriptionActive => {
                "You already have an active subscription. Cancel it before subscribing to another plan"
            }
            DenialReason::AlreadyPurchased => "You have already purchased this product",
            DenialReason::LookupFailed => {
                "We could not verify your existing purchases. Please try again"
            }
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Result of `can_purchase`: a verdict plus the reason when refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseEligibility {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
}

impl PurchaseEligibility {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// A single user's purchase and subscription rows.
#[derive(Debug, Clone, Default)]
pub struct Entitlements {
    purchases: Vec<PurchaseRecord>,
    subscriptions: Vec<SubscriptionRecord>,
}

impl Entitlements {
    pub fn new(purchases: Vec<PurchaseRecord>, subscriptions: Vec<SubscriptionRecord>) -> Self {
        Self {
            purchases,
            subscriptions,
        }
    }

    pub fn purchases(&self) -> &[PurchaseRecord] {
        &self.purchases
    }

    pub fn subscriptions(&self) -> &[SubscriptionRecord] {
        &self.subscriptions
    }

    /// True if a succeeded payment for `product_name` exists.
    pub fn has_purchased(&self, product_name: &str) -> bool {
        self.purchases.iter().any(|p| p.grants(product_name))
    }

    /// True if any subscription is active at `now`, optionally restricted
    /// to `plan_name`.
    pub fn has_active_subscription(&self, plan_name: Option<&str>, now: Timestamp) -> bool {
        self.subscriptions
            .iter()
            .filter(|s| plan_name.map_or(true, |plan| s.plan_name == plan))
            .any(|s| s.is_active_at(now))
    }

    /// Decides whether `plan_name` may be bought.
    ///
    /// Subscriptions are refused while the same plan is active, then while
    /// any other subscription is active. One-time products are refused once
    /// bought. Everything else is allowed.
    pub fn can_purchase(
        &self,
        plan_name: &str,
        is_subscription: bool,
        now: Timestamp,
    ) -> PurchaseEligibility {
        if is_subscription {
            if self.has_active_subscription(Some(plan_name), now) {
                return PurchaseEligibility::denied(DenialReason::AlreadySubscribedToPlan);
            }
            if self.has_active_subscription(None, now) {
                return PurchaseEligibility::denied(DenialReason::OtherSubscriptionActive);
            }
        } else if self.has_purchased(plan_name) {
            return PurchaseEligibility::denied(DenialReason::AlreadyPurchased);
        }

        PurchaseEligibility::allowed()
    }
}
