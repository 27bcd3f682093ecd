//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `ACADEMY_PAYMENTS` prefix
//! and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use academy_payments::config::AppConfig;
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
pub use payment::{GatewayConfig, PaymentConfig};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`]. Every section has defaults, so an empty
/// environment yields a development server backed by the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, limits)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gateway secrets, allow-lists and lookup timeout
    #[serde(default)]
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ACADEMY_PAYMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `ACADEMY_PAYMENTS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ACADEMY_PAYMENTS__DATABASE__URL=...` -> `database.url = ...`
    /// - `ACADEMY_PAYMENTS__PAYMENT__TAP__HMAC_SECRET=...` -> `payment.tap.hmac_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ACADEMY_PAYMENTS")
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
    /// Returns `ValidationError` if any configuration value is invalid, or if
    /// production runs without a database or without gateway secrets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        if self.is_production() && !self.database.is_configured() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        self.payment.validate(self.is_production())?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ACADEMY_PAYMENTS__DATABASE__URL",
        "ACADEMY_PAYMENTS__SERVER__PORT",
        "ACADEMY_PAYMENTS__SERVER__ENVIRONMENT",
        "ACADEMY_PAYMENTS__PAYMENT__TAP__HMAC_SECRET",
        "ACADEMY_PAYMENTS__PAYMENT__LOOKUP_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_empty_environment_loads_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(!config.database.is_configured());
        assert_eq!(config.payment.lookup_timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_values_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("ACADEMY_PAYMENTS__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("ACADEMY_PAYMENTS__SERVER__PORT", "3000");
        env::set_var("ACADEMY_PAYMENTS__PAYMENT__TAP__HMAC_SECRET", "tap_secret");
        env::set_var("ACADEMY_PAYMENTS__PAYMENT__LOOKUP_TIMEOUT_SECS", "3");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.lookup_timeout_secs, 3);
        assert_eq!(
            config.payment.tap.hmac_secret.as_ref().unwrap().expose_secret(),
            "tap_secret"
        );
    }

    #[test]
    fn test_production_requires_database() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("ACADEMY_PAYMENTS__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }
}
