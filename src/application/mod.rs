//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::{
    // Commands
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, HandleStripeWebhookResult,
    // Queries
    CheckPurchaseEligibilityHandler, CheckPurchaseEligibilityQuery,
    CheckPurchaseEligibilityResult, GetUserPurchasesHandler, GetUserPurchasesQuery,
    GetUserPurchasesResult,
    CheckoutUrls,
};
