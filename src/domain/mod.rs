//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `billing` - Purchases, subscriptions, plan catalog and entitlements
//! - `webhook` - Stripe webhook verification and idempotent processing

pub mod billing;
pub mod foundation;
pub mod webhook;
