//! Client core configuration

use serde::Deserialize;
use std::time::Duration;

use super::broadcast::{default_stream_path, default_ws_path};
use super::error::ValidationError;
use crate::domain::notification::DEFAULT_FEED_CAPACITY;

/// Where the client connects and how it keeps the connection alive.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Relay base URL, e.g. `http://localhost:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Ping interval on the primary channel
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Extra silence tolerated past one heartbeat interval before the primary channel counts as dead
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    /// Silence tolerated on the fallback stream
    #[serde(default = "default_stream_liveness_timeout")]
    pub stream_liveness_timeout_secs: u64,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Maximum cached notifications
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Open the fallback stream alongside the primary channel
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
}

impl ClientConfig {
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Primary channel URL: the base URL with its scheme switched to ws/wss.
    pub fn ws_url(&self) -> Result<String, ValidationError> {
        let base = self.base_url.trim_end_matches('/');
        let switched = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return Err(ValidationError::InvalidBaseUrl);
        };
        Ok(format!("{}{}", switched, self.ws_path))
    }

    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.stream_path)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn stream_liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_liveness_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ws_url()?;
        if !self.ws_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("CLIENT__WS_PATH"));
        }
        if !self.stream_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("CLIENT__STREAM_PATH"));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("CLIENT__HEARTBEAT_INTERVAL_SECS"));
        }
        if self.stream_liveness_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive(
                "CLIENT__STREAM_LIVENESS_TIMEOUT_SECS",
            ));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ValidationError::MustBePositive("CLIENT__RECONNECT_DELAY_MS"));
        }
        if self.cache_capacity == 0 {
            return Err(ValidationError::MustBePositive("CLIENT__CACHE_CAPACITY"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_path: default_ws_path(),
            stream_path: default_stream_path(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            liveness_timeout_secs: default_liveness_timeout(),
            stream_liveness_timeout_secs: default_stream_liveness_timeout(),
            reconnect_delay_ms: default_reconnect_delay(),
            cache_capacity: default_cache_capacity(),
            fallback_enabled: default_fallback_enabled(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_liveness_timeout() -> u64 {
    10
}

fn default_stream_liveness_timeout() -> u64 {
    75
}

fn default_reconnect_delay() -> u64 {
    3000
}

fn default_cache_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

fn default_fallback_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_switches_scheme() {
        let plain = ClientConfig::for_base_url("http://relay.local:8080/");
        assert_eq!(plain.ws_url().unwrap(), "ws://relay.local:8080/ws");

        let tls = ClientConfig::for_base_url("https://relay.example.com");
        assert_eq!(tls.ws_url().unwrap(), "wss://relay.example.com/ws");
    }

    #[test]
    fn test_stream_url_joins_path() {
        let config = ClientConfig::for_base_url("http://relay.local:8080/");
        assert_eq!(
            config.stream_url(),
            "http://relay.local:8080/api/notifications/stream"
        );
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let config = ClientConfig::for_base_url("ftp://relay.local");
        assert_eq!(config.validate(), Err(ValidationError::InvalidBaseUrl));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.cache_capacity, 50);
        assert!(config.fallback_enabled);
        assert!(config.validate().is_ok());
    }
}
