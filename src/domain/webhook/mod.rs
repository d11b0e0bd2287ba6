//! Stripe webhook domain module.
//!
//! - `stripe_event` - Event envelope and handled event types
//! - `objects` - Typed `checkout.session` and `subscription` payloads
//! - `webhook_verifier` - `Stripe-Signature` verification
//! - `webhook_errors` - WebhookError and its HTTP status mapping
//! - `processor` - Idempotent dispatch over the webhook event log

mod objects;
mod processor;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use objects::{
    CheckoutSessionObject, Price, Recurring, SubscriptionItem, SubscriptionItems,
    SubscriptionObject, METADATA_PRICE_ID, METADATA_PRODUCT_NAME, METADATA_USER_ID,
};
pub use processor::{IdempotentWebhookProcessor, WebhookDispatcher, WebhookEventHandler};
pub use stripe_event::{EventPayload, StripeEvent, StripeEventType};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
