//! Webhook event handlers.
//!
//! One `WebhookEventHandler` per family of Stripe events, combined by
//! `BillingWebhookDispatcher` and run through the idempotent processor.
//! `PruneWebhookEventsHandler` keeps the event log bounded.

mod checkout_completed;
mod dispatcher;
mod prune_events;
mod subscription_lifecycle;

pub use checkout_completed::CheckoutCompletedHandler;
pub use dispatcher::BillingWebhookDispatcher;
pub use prune_events::{
    PruneWebhookEventsCommand, PruneWebhookEventsHandler, PruneWebhookEventsResult,
};
pub use subscription_lifecycle::SubscriptionLifecycleHandler;
