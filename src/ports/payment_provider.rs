//! Payment provider port.
//!
//! The provider owns the checkout pages and the subscription lifecycle.
//! This port only covers the calls the service makes into it: creating
//! customers, opening hosted checkout sessions, and scheduling a
//! cancellation. Everything else reaches the service through webhooks.

use crate::domain::billing::PricingPlan;
use crate::domain::foundation::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer. The user id is attached as metadata.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Open a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Schedule cancellation at the end of the current period.
    async fn cancel_subscription_at_period_end(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<(), PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID (cus_...).
    pub id: String,
    pub email: Option<String>,
}

/// How the hosted checkout collects money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
    /// Recurring subscription.
    Subscription,
}

impl CheckoutMode {
    pub fn for_plan(plan: &PricingPlan) -> Self {
        if plan.is_subscription() {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    /// Session metadata; echoed back in `checkout.session.completed`.
    pub metadata: HashMap<String, String>,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID (cs_...).
    pub id: String,
    /// Hosted page the browser is redirected to.
    pub url: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's own error code, if it sent one.
    pub provider_code: Option<String>,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanCatalog;

    #[test]
    fn checkout_mode_follows_plan_interval() {
        let catalog = PlanCatalog::standard();
        let one_time = catalog.find_by_price_id("price_onetime_pro").unwrap();
        let monthly = catalog.find_by_price_id("price_sub_pro_monthly").unwrap();

        assert_eq!(CheckoutMode::for_plan(one_time), CheckoutMode::Payment);
        assert_eq!(CheckoutMode::for_plan(monthly), CheckoutMode::Subscription);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(PaymentError::network("reset").is_retryable());
        assert!(PaymentError::new(PaymentErrorCode::RateLimitExceeded, "slow down").is_retryable());
        assert!(!PaymentError::new(PaymentErrorCode::AuthenticationError, "bad key").is_retryable());
        assert!(!PaymentError::not_found("customer").is_retryable());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = PaymentError::provider("No such price").with_provider_code("resource_missing");
        assert_eq!(err.to_string(), "provider_error: No such price");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }
}
