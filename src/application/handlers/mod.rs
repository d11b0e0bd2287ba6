//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.
//!
//! - `billing` - Checkout, listings, eligibility, cancellation, webhook intake
//! - `webhook` - Per-event handlers behind the webhook dispatcher

pub mod billing;
pub mod webhook;

pub use billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CheckPurchaseEligibilityHandler, CheckPurchaseEligibilityQuery,
    CheckPurchaseEligibilityResult, CheckoutUrls, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, CreateCheckoutSessionResult, GetUserPurchasesHandler,
    GetUserPurchasesQuery, GetUserPurchasesResult, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, HandleStripeWebhookResult,
};
pub use webhook::{
    BillingWebhookDispatcher, CheckoutCompletedHandler, PruneWebhookEventsCommand,
    PruneWebhookEventsHandler, PruneWebhookEventsResult, SubscriptionLifecycleHandler,
};
