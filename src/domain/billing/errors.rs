//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | UnknownPlan | 400 |
//! | PurchaseNotAllowed | 403 |
//! | SubscriptionNotFound | 404 |
//! | PaymentProvider | 502 |
//! | Infrastructure | 500 |

use super::DenialReason;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PaymentError;

/// Errors raised by billing use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Request input was rejected.
    ValidationFailed { field: String, message: String },

    /// The price id is not in the plan catalog.
    UnknownPlan(String),

    /// The entitlement check refused the purchase.
    PurchaseNotAllowed(DenialReason),

    /// No subscription with this provider id belongs to the caller.
    SubscriptionNotFound(String),

    /// The payment provider call failed.
    PaymentProvider(String),

    /// Storage or other infrastructure failed.
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_plan(price_id: impl Into<String>) -> Self {
        BillingError::UnknownPlan(price_id.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::UnknownPlan(_) => ErrorCode::UnknownPlan,
            BillingError::PurchaseNotAllowed(_) => ErrorCode::PurchaseNotAllowed,
            BillingError::SubscriptionNotFound(_) => ErrorCode::NotFound,
            BillingError::PaymentProvider(_) => ErrorCode::PaymentProviderError,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing message. Internal detail stays in the logs.
    pub fn message(&self) -> String {
        match self {
            BillingError::ValidationFailed { message, .. } => message.clone(),
            BillingError::UnknownPlan(price_id) => format!("Unknown price: {}", price_id),
            BillingError::PurchaseNotAllowed(reason) => reason.message().to_string(),
            BillingError::SubscriptionNotFound(_) => "Subscription not found".to_string(),
            BillingError::PaymentProvider(_) => {
                "Payment provider is unavailable. Please try again".to_string()
            }
            BillingError::Infrastructure(_) => "Internal server error".to_string(),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::PaymentProvider(_) | BillingError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingError::PaymentProvider(detail) => write!(f, "Payment provider error: {}", detail),
            BillingError::Infrastructure(detail) => write!(f, "Infrastructure error: {}", detail),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::PaymentProviderError => BillingError::PaymentProvider(err.message),
            _ => BillingError::Infrastructure(err.message),
        }
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::PaymentProvider(err.to_string())
    }
}
