//! Webhook error types for Stripe webhook handling.
//!
//! Status codes decide Stripe's redelivery behaviour: 2xx acknowledges,
//! 4xx is final, 5xx is redelivered by Stripe on its own schedule.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The Stripe-Signature header was absent.
    #[error("No signature found")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A test-mode event reached a deployment that only accepts live events.
    #[error("Test mode event rejected")]
    LivemodeMismatch,

    /// Event was intentionally dropped (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if Stripe should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_)
            | WebhookError::LivemodeMismatch => StatusCode::BAD_REQUEST,

            WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Storage detail is never echoed.
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::Database(_) => "Webhook handler failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_signature_displays_correctly() {
        assert_eq!(format!("{}", WebhookError::MissingSignature), "No signature found");
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(format!("{}", err), "Parse error: invalid JSON");
    }

    #[test]
    fn missing_field_displays_field_name() {
        let err = WebhookError::MissingField("current_period_end");
        assert_eq!(format!("{}", err), "Missing field: current_period_end");
    }

    #[test]
    fn signature_failures_are_bad_requests() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn ignored_events_are_acknowledged() {
        let err = WebhookError::Ignored("no user".to_string());
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(!err.is_retryable());
    }

    #[test]
    fn database_errors_are_retryable_server_errors() {
        let err = WebhookError::Database("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
        assert_eq!(err.public_message(), "Webhook handler failed");
    }

    #[test]
    fn domain_error_converts_to_database_error() {
        let err: WebhookError = DomainError::database("pool timed out").into();
        assert!(matches!(err, WebhookError::Database(msg) if msg.contains("pool timed out")));
    }
}
