//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe: customer creation,
//! hosted checkout sessions and scheduled cancellation. Webhook
//! verification lives in the domain, since it needs no HTTP client.
//!
//! The secret API key is held in a `secrecy::SecretString`.

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
