//! Billing handlers.
//!
//! ## Commands
//! - Creating hosted checkout sessions
//! - Scheduling subscription cancellation
//! - Ingesting signed Stripe webhooks
//!
//! ## Queries
//! - Listing a user's purchases and subscriptions
//! - Checking purchase eligibility

mod cancel_subscription;
mod check_purchase_eligibility;
mod create_checkout_session;
mod get_user_purchases;
mod handle_stripe_webhook;

use crate::domain::billing::Entitlements;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{PaymentRepository, SubscriptionRepository};

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use create_checkout_session::{
    CheckoutUrls, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
    CreateCheckoutSessionResult,
};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, HandleStripeWebhookResult,
};

// Queries
pub use check_purchase_eligibility::{
    CheckPurchaseEligibilityHandler, CheckPurchaseEligibilityQuery,
    CheckPurchaseEligibilityResult,
};
pub use get_user_purchases::{GetUserPurchasesHandler, GetUserPurchasesQuery, GetUserPurchasesResult};

/// Fetches both record lists for one user concurrently.
pub(crate) async fn load_entitlements(
    payments: &dyn PaymentRepository,
    subscriptions: &dyn SubscriptionRepository,
    user_id: &UserId,
) -> Result<Entitlements, DomainError> {
    let (purchases, subscriptions) = tokio::try_join!(
        payments.list_by_user(user_id),
        subscriptions.list_by_user(user_id)
    )?;
    Ok(Entitlements::new(purchases, subscriptions))
}
