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

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("JWT secret must be at least {min} bytes")]
    SecretTooShort { min: usize },

    #[error("Endpoint path must start with '/': {0}")]
    InvalidPath(&'static str),

    #[error("Base URL must use http or https")]
    InvalidBaseUrl,

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Stream heartbeat interval must be shorter than the maximum stream duration")]
    HeartbeatExceedsStreamDuration,
}
