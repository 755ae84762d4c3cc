//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `COURSE_PAYMENTS`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use course_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{ClickSettings, CurrencySettings, PaymeSettings, PaymentConfig, StripeSettings};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "COURSE_PAYMENTS";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address, environment, logging
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection pool
    pub database: DatabaseConfig,

    /// Stripe, Payme, Click and exchange rate
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `COURSE_PAYMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `COURSE_PAYMENTS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `COURSE_PAYMENTS__PAYMENT__STRIPE__API_KEY=...` -> `payment.stripe.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a value
    /// cannot be parsed into its expected type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Reads the process environment without consulting `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found.
    /// Production additionally requires HTTPS for provider URLs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        if self.is_production() {
            self.payment.validate_for_production()?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
