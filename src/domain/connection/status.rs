//! What the consumer sees of the connection lifecycle.

use serde::Serialize;
use thiserror::Error;

use super::{PrimaryState, StreamState};
use crate::domain::notification::TransportKind;

/// Failure taxonomy surfaced to the consumer.
///
/// Transport errors are recovered by a scheduled reconnect. Authentication
/// errors suspend retries until the identity token is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("{transport} transport error: {message}")]
    Transport {
        transport: TransportKind,
        message: String,
    },

    #[error("authentication failed: {message}")]
    Authentication { message: String },
}

impl ConnectionError {
    pub fn transport(transport: TransportKind, message: impl Into<String>) -> Self {
        Self::Transport {
            transport,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Tri-state view of both transports combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub error: Option<String>,
    /// Set after an authentication failure; cleared by a token refresh.
    pub needs_reauthentication: bool,
}

impl ConnectionStatus {
    /// Derives the consumer view from both transport states and the last error.
    ///
    /// Connected means at least one transport is delivering. The error is
    /// cleared as soon as either transport is healthy.
    pub fn derive(
        primary: PrimaryState,
        stream: StreamState,
        last_error: Option<&ConnectionError>,
    ) -> Self {
        let is_connected = primary.is_authenticated() || stream.is_open();
        let is_connecting = !is_connected
            && (primary.is_pending() || matches!(stream, StreamState::Connecting));
        let needs_reauthentication = last_error.map_or(false, ConnectionError::is_authentication);
        let error = if is_connected && !needs_reauthentication {
            None
        } else {
            last_error.map(ToString::to_string)
        };

        Self {
            is_connected,
            is_connecting,
            error,
            needs_reauthentication,
        }
    }
}
