//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `PaymentRepository` - One-time payment rows
//! - `SubscriptionRepository` - Subscription rows mirrored from Stripe
//! - `CustomerRepository` - User to Stripe customer mapping
//! - `WebhookEventRepository` - Stripe webhook idempotency log
//!
//! ## External Service Ports
//!
//! - `PaymentProvider` - Customers, hosted checkout and cancellation
//! - `SessionValidator` - Session token validation

mod customer_repository;
mod payment_provider;
mod payment_repository;
mod session_validator;
mod subscription_repository;
mod webhook_event_repository;

pub use customer_repository::CustomerRepository;
pub use payment_provider::{
    CheckoutMode, CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer,
    PaymentError, PaymentErrorCode, PaymentProvider,
};
pub use payment_repository::PaymentRepository;
pub use session_validator::SessionValidator;
pub use subscription_repository::{StateChange, SubscriptionRepository};
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookEventResult, WebhookResult,
};
