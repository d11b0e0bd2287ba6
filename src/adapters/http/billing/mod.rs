//! HTTP adapter for billing endpoints.
//!
//! Exposes checkout, purchase history and webhook intake via REST API:
//! - `POST /api/stripe/create-checkout-session` - Start a hosted checkout
//! - `GET /api/stripe/user-purchases` - Current user's payments and subscriptions
//! - `GET /api/stripe/subscription` - Same data in the provider's object shape
//! - `GET /api/stripe/can-purchase` - Eligibility check for a plan
//! - `POST /api/stripe/cancel-subscription` - Cancel at period end
//! - `POST /api/stripe/webhook` - Signed Stripe events
//! - `GET /api/me` - Current session identity

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState, WebhookApiError, STRIPE_SIGNATURE_HEADER};
pub use routes::{billing_router, stripe_routes};
