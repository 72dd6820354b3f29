//! Relay listener settings.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use serde::Deserialize;

use super::error::ValidationError;

/// Where the relay listens and which browser origins may open streams.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind; IPv4 or IPv6.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Production turns on JSON logs and requires a real JWT secret.
    #[serde(default)]
    pub environment: Environment,

    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Comma-separated browser origins. Unset allows any origin.
    pub cors_origins: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ValidationError> {
        self.host
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.port))
            .map_err(|_| ValidationError::InvalidBindAddress(self.host.clone()))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Parsed `cors_origins`. Empty means any origin is allowed.
    ///
    /// Each entry must be an `http` or `https` origin usable as an
    /// `Access-Control-Allow-Origin` value.
    pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>, ValidationError> {
        let Some(raw) = &self.cors_origins else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
                match HeaderValue::from_str(origin) {
                    Ok(value) if scheme_ok && !origin.ends_with('/') => Ok(value),
                    _ => Err(ValidationError::InvalidOrigin(origin.to_string())),
                }
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.bind_addr()?;
        self.allowed_origins()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
            cors_origins: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,notification_relay=debug,tower_http=info".to_string()
}
