//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - One-time payment rows
//! - `PostgresSubscriptionRepository` - Subscription rows keyed by Stripe id
//! - `PostgresCustomerRepository` - User to Stripe customer mapping
//! - `PostgresWebhookEventRepository` - Webhook idempotency log
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod customer_repository;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use customer_repository::PostgresCustomerRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
