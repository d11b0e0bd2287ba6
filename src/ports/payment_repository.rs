//! Payment repository port.
//!
//! Rows are written only by the webhook ingester. Reads serve the purchase
//! listings and the entitlement check.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::billing::PurchaseRecord;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment row.
    ///
    /// `stripe_session_id` is unique; a second insert for the same checkout
    /// session keeps the existing row and returns `AlreadyExists`.
    async fn insert(&self, payment: &PurchaseRecord) -> Result<SaveResult, DomainError>;

    /// All payments of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PurchaseRecord>, DomainError>;
}
