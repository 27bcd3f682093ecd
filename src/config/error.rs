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
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid request body limit")]
    InvalidBodyLimit,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool max_connections must be at least 1")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid pool acquire timeout (1-30 seconds)")]
    InvalidAcquireTimeout,

    #[error("Invalid gateway lookup timeout (1-60 seconds)")]
    InvalidLookupTimeout,

    #[error("Invalid IP address in {gateway} allow-list: {value}")]
    InvalidAllowedIp { gateway: &'static str, value: String },

    #[error("Invalid trusted proxy address: {0}")]
    InvalidTrustedProxy(String),

    #[error("Webhook secret for {0} is required in production")]
    MissingWebhookSecret(&'static str),
}
