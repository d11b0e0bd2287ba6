//! SaaS Starter - Billing and entitlement backend
//!
//! This crate records one-time purchases and subscriptions from signed
//! Stripe webhooks, answers entitlement questions over those records and
//! starts hosted checkout sessions for signed-in users.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
