//! Transport lifecycle states.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Lifecycle of the primary (WebSocket) channel.
///
/// `Disconnected -> Connecting -> Connected -> Authenticating -> Authenticated`.
/// Every non-disconnected state may fall back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
}

impl PrimaryState {
    /// True while a connect attempt is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            PrimaryState::Connecting | PrimaryState::Connected | PrimaryState::Authenticating
        )
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, PrimaryState::Authenticated)
    }

    /// True unless disconnected; `connect()` is a no-op in any of these.
    pub fn is_active(&self) -> bool {
        !matches!(self, PrimaryState::Disconnected)
    }
}

impl StateMachine for PrimaryState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PrimaryState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connected, Authenticating)
                | (Authenticating, Authenticated)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
                | (Authenticating, Disconnected)
                | (Authenticated, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PrimaryState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Connected, Disconnected],
            Connected => vec![Authenticating, Disconnected],
            Authenticating => vec![Authenticated, Disconnected],
            Authenticated => vec![Disconnected],
        }
    }
}

/// Lifecycle of the fallback (SSE) stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

impl StreamState {
    pub fn is_open(&self) -> bool {
        matches!(self, StreamState::Open)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, StreamState::Disconnected)
    }
}

impl StateMachine for StreamState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StreamState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Open)
                | (Connecting, Disconnected)
                | (Open, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use StreamState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Open, Disconnected],
            Open => vec![Disconnected],
        }
    }
}
