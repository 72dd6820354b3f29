//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `NOTIFICATION_RELAY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use notification_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.bind_addr());
//! ```

mod auth;
mod broadcast;
mod client;
mod error;
mod server;

pub use auth::{AuthConfig, MIN_SECRET_LEN};
pub use broadcast::BroadcastConfig;
pub use client::ClientConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity token and producer key settings
    pub auth: AuthConfig,

    /// Endpoint paths and stream timing
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Settings for the listener binary and embedded client sessions
    #[serde(default)]
    pub client: ClientConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `NOTIFICATION_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `NOTIFICATION_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `NOTIFICATION_RELAY__AUTH__JWT_SECRET=...` -> `auth.jwt_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NOTIFICATION_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.broadcast.validate()?;
        self.client.validate()?;
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
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("NOTIFICATION_RELAY__AUTH__JWT_SECRET", "test-secret");
    }

    fn clear_env() {
        env::remove_var("NOTIFICATION_RELAY__AUTH__JWT_SECRET");
        env::remove_var("NOTIFICATION_RELAY__SERVER__PORT");
        env::remove_var("NOTIFICATION_RELAY__SERVER__ENVIRONMENT");
        env::remove_var("NOTIFICATION_RELAY__BROADCAST__STREAM_MAX_DURATION_SECS");
        env::remove_var("NOTIFICATION_RELAY__CLIENT__FALLBACK_ENABLED");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.auth.jwt_secret, "test-secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply_to_missing_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.broadcast.stream_path, "/api/notifications/stream");
        assert_eq!(config.client.cache_capacity, 50);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("NOTIFICATION_RELAY__SERVER__PORT", "3000");
        env::set_var("NOTIFICATION_RELAY__BROADCAST__STREAM_MAX_DURATION_SECS", "120");
        env::set_var("NOTIFICATION_RELAY__CLIENT__FALLBACK_ENABLED", "false");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.broadcast.stream_max_duration_secs, 120);
        assert!(!config.client.fallback_enabled);
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("NOTIFICATION_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
