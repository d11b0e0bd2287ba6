//! Customer mapping port.
//!
//! One row per user linking the local user id to the provider customer.
//! Webhooks that only carry a `customer` id are resolved through it.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Provider customer id of a user.
    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError>;

    /// User owning a provider customer id.
    async fn find_user_id(&self, stripe_customer_id: &str)
        -> Result<Option<UserId>, DomainError>;

    /// Store a mapping. Both sides are unique; an existing mapping for
    /// either side is kept and `AlreadyExists` is returned.
    async fn save(
        &self,
        user_id: &UserId,
        stripe_customer_id: &str,
    ) -> Result<SaveResult, DomainError>;
}
