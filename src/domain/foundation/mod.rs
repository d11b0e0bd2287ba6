//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, error types and the authenticated user
//! that the billing and webhook modules build on.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PurchaseId, SubscriptionId, UserId};
pub use timestamp::Timestamp;
