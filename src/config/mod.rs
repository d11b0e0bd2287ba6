//! Application configuration module
//!
//! Type-safe configuration loaded with the `config` and `dotenvy` crates.
//! An optional `saas-starter.toml` is read first, then environment
//! variables with the `SAAS_STARTER` prefix override it. Nested values
//! use a double underscore as separator.
//!
//! # Example
//!
//! ```no_run
//! use saas_starter::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::domain::billing::{PlanCatalog, PricingPlan};

/// Base name of the optional configuration file.
pub const CONFIG_FILE: &str = "saas-starter";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "SAAS_STARTER";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, app URL)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Session validation configuration
    pub auth: AuthConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Plan catalog; empty means the built-in catalog
    #[serde(default)]
    pub plans: Vec<PricingPlan>,
}

impl AppConfig {
    /// Load configuration from `saas-starter.toml` (optional) and the environment
    ///
    /// # Environment Variable Format
    ///
    /// - `SAAS_STARTER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SAAS_STARTER__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from an explicit TOML file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::new(
                &path.to_string_lossy(),
                config::FileFormat::Toml,
            ))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.payment.validate(&self.server.environment)?;
        validate_plans(&self.plans)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// The configured catalog, or the built-in one.
    pub fn plan_catalog(&self) -> PlanCatalog {
        PlanCatalog::from_config(&self.plans)
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn validate_plans(plans: &[PricingPlan]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for plan in plans {
        let invalid = |reason| ValidationError::InvalidPlan {
            price_id: plan.price_id.clone(),
            reason,
        };
        if plan.price_id.trim().is_empty() {
            return Err(invalid("price id is empty"));
        }
        if plan.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if plan.amount < 0 {
            return Err(invalid("amount is negative"));
        }
        if !seen.insert(plan.price_id.as_str()) {
            return Err(invalid("price id is listed twice"));
        }
    }
    Ok(())
}
