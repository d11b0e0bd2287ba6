//! CheckPurchaseEligibilityHandler - Query handler for the pricing page.
//!
//! Always produces a verdict. A missing session or a failed lookup is
//! reported as a denial rather than an error, so the pricing page can
//! render a disabled button instead of an error state.

use std::sync::Arc;

use super::load_entitlements;
use crate::domain::billing::{DenialReason, PurchaseEligibility};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{PaymentRepository, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct CheckPurchaseEligibilityQuery {
    /// `None` when the request carries no session.
    pub user_id: Option<UserId>,
    pub plan_name: String,
    pub is_subscription: bool,
}

pub type CheckPurchaseEligibilityResult = PurchaseEligibility;

pub struct CheckPurchaseEligibilityHandler {
    payments: Arc<dyn PaymentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl CheckPurchaseEligibilityHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            payments,
            subscriptions,
        }
    }

    pub async fn handle(&self, query: CheckPurchaseEligibilityQuery) -> CheckPurchaseEligibilityResult {
        let Some(user_id) = query.user_id else {
            return PurchaseEligibility::denied(DenialReason::NotLoggedIn);
        };

        match load_entitlements(self.payments.as_ref(), self.subscriptions.as_ref(), &user_id).await
        {
            Ok(entitlements) => {
                entitlements.can_purchase(&query.plan_name, query.is_subscription, Timestamp::now())
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    plan_name = %query.plan_name,
                    error = %e,
                    "Entitlement lookup failed"
                );
                PurchaseEligibility::denied(DenialReason::LookupFailed)
            }
        }
    }
}
