//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("App URL must be an absolute http(s) URL")]
    InvalidAppUrl,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Session secret must be at least 32 bytes in production")]
    SessionSecretTooShort,

    #[error("Invalid session cookie name")]
    InvalidSessionCookie,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Live Stripe keys are only allowed in production")]
    LiveKeyOutsideProduction,

    #[error("Webhook tolerance must be between 1 and 3600 seconds")]
    InvalidWebhookTolerance,

    #[error("Webhook retention must be at least one day")]
    InvalidWebhookRetention,

    #[error("Invalid plan {price_id}: {reason}")]
    InvalidPlan { price_id: String, reason: &'static str },
}
