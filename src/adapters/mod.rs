//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session token validation (JWT, mock)
//! - `http` - Axum routes, DTOs and middleware
//! - `memory` - In-process repositories for tests and local runs
//! - `postgres` - sqlx repositories
//! - `stripe` - Stripe API client and mock provider

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use auth::{JwtConfig, JwtSessionValidator, MockSessionValidator};
pub use memory::InMemoryBillingStore;
pub use postgres::{
    PostgresCustomerRepository, PostgresPaymentRepository, PostgresSubscriptionRepository,
    PostgresWebhookEventRepository,
};
pub use stripe::{MockPaymentProvider, StripeConfig, StripePaymentAdapter};
