//! Billing domain module.
//!
//! Purchase and subscription rows, the plan catalog and the entitlement
//! rules evaluated over them.
//!
//! # Module Structure
//!
//! - `purchase` - One-time payment rows and their status
//! - `subscription` - Subscription rows mirrored from the provider
//! - `plan` - Price id to plan name catalog
//! - `entitlement` - `has_purchased` / `has_active_subscription` / `can_purchase`
//! - `errors` - BillingError and its error codes

mod entitlement;
mod errors;
mod plan;
pub(crate) mod purchase;
pub(crate) mod subscription;

pub use entitlement::{DenialReason, Entitlements, PurchaseEligibility};
pub use errors::BillingError;
pub use plan::{PlanCatalog, PlanInterval, PricingPlan};
pub use purchase::{PaymentStatus, PurchaseRecord, UNKNOWN_PRODUCT};
pub use subscription::{SubscriptionRecord, SubscriptionStateUpdate, SubscriptionStatus};
