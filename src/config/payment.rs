//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (`sk_...`)
    pub stripe_api_key: String,

    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,

    /// Stripe API base URL; overridden in tests and for mock servers
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,

    /// Maximum age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Days of webhook event log kept for idempotency checks
    #[serde(default = "default_webhook_retention")]
    pub webhook_retention_days: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }

        // Restricted (rk_) and publishable keys cannot create sessions.
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.is_live_mode() && *environment != Environment::Production {
            return Err(ValidationError::LiveKeyOutsideProduction);
        }
        if !(1..=3600).contains(&self.webhook_tolerance_secs) {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.webhook_retention_days < 1 {
            return Err(ValidationError::InvalidWebhookRetention);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            require_livemode: false,
            webhook_tolerance_secs: default_webhook_tolerance(),
            webhook_retention_days: default_webhook_retention(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_webhook_retention() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keys() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_detection() {
        let config = test_keys();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(config.webhook_retention_days, 30);
    }

    #[test]
    fn test_validation_missing_webhook_secret() {
        let config = PaymentConfig {
            stripe_webhook_secret: String::new(),
            ..test_keys()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn test_validation_invalid_prefixes() {
        let publishable = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            ..test_keys()
        };
        assert_eq!(
            publishable.validate(&Environment::Development),
            Err(ValidationError::InvalidStripeKey)
        );

        let bad_secret = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..test_keys()
        };
        assert_eq!(
            bad_secret.validate(&Environment::Development),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_live_key_requires_production() {
        let config = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..test_keys()
        };
        assert_eq!(
            config.validate(&Environment::Staging),
            Err(ValidationError::LiveKeyOutsideProduction)
        );
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_retention_and_tolerance_bounds() {
        let config = PaymentConfig {
            webhook_retention_days: 0,
            ..test_keys()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidWebhookRetention)
        );

        let config = PaymentConfig {
            webhook_tolerance_secs: 0,
            ..test_keys()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidWebhookTolerance)
        );
    }
}
