//! Broadcast server configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Endpoint paths and timing for the broadcast server.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Primary channel (WebSocket) path
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Fallback stream (SSE) path
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Per-connection outbound buffer; a full buffer drops deliveries for that connection
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,

    #[serde(default = "default_stream_heartbeat_interval")]
    pub stream_heartbeat_interval_secs: u64,

    /// Streams are closed with `timeout` after this long
    #[serde(default = "default_stream_max_duration")]
    pub stream_max_duration_secs: u64,

    /// Sockets that have not authenticated within this window are closed
    #[serde(default = "default_authenticate_timeout")]
    pub authenticate_timeout_secs: u64,
}

impl BroadcastConfig {
    pub fn stream_heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.stream_heartbeat_interval_secs)
    }

    pub fn stream_max_duration(&self) -> Duration {
        Duration::from_secs(self.stream_max_duration_secs)
    }

    pub fn authenticate_timeout(&self) -> Duration {
        Duration::from_secs(self.authenticate_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.ws_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("BROADCAST__WS_PATH"));
        }
        if !self.stream_path.starts_with('/') {
            return Err(ValidationError::InvalidPath("BROADCAST__STREAM_PATH"));
        }
        if self.connection_buffer == 0 {
            return Err(ValidationError::MustBePositive("BROADCAST__CONNECTION_BUFFER"));
        }
        if self.stream_heartbeat_interval_secs == 0 {
            return Err(ValidationError::MustBePositive(
                "BROADCAST__STREAM_HEARTBEAT_INTERVAL_SECS",
            ));
        }
        if self.authenticate_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive(
                "BROADCAST__AUTHENTICATE_TIMEOUT_SECS",
            ));
        }
        if self.stream_heartbeat_interval_secs >= self.stream_max_duration_secs {
            return Err(ValidationError::HeartbeatExceedsStreamDuration);
        }
        Ok(())
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            ws_path: default_ws_path(),
            stream_path: default_stream_path(),
            connection_buffer: default_connection_buffer(),
            stream_heartbeat_interval_secs: default_stream_heartbeat_interval(),
            stream_max_duration_secs: default_stream_max_duration(),
            authenticate_timeout_secs: default_authenticate_timeout(),
        }
    }
}

pub(super) fn default_ws_path() -> String {
    "/ws".to_string()
}

pub(super) fn default_stream_path() -> String {
    "/api/notifications/stream".to_string()
}

fn default_connection_buffer() -> usize {
    64
}

fn default_stream_heartbeat_interval() -> u64 {
    30
}

fn default_stream_max_duration() -> u64 {
    300
}

fn default_authenticate_timeout() -> u64 {
    10
}
