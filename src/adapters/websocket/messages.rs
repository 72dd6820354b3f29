//! Primary channel protocol.
//!
//! Every frame is a JSON text frame `{"event": <name>, "data": <payload>}`
//! with snake_case event names. Unit events omit `data`.
//!
//! - Client → Server: authenticate, join/leave team, read acknowledgements, pings
//! - Server → Client: handshake results, notifications, acks, pongs, errors
//!
//! Both directions derive `Serialize` and `Deserialize` so the client core
//! decodes exactly what the server encodes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ClientId, ErrorCode, NotificationId, TeamId, Timestamp, UserId};
use crate::domain::notification::{Notification, SystemNotification};

use super::rooms::Delivery;

// ============================================
// Server → Client Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Identity token accepted; the connection is in its user room.
    Authenticated(AuthenticatedMessage),

    /// Identity token rejected. The server closes the socket afterwards.
    AuthError(AuthErrorMessage),

    /// Connection joined a team room.
    TeamJoined(TeamMessage),

    Notification(Notification),

    SystemNotification(SystemNotification),

    /// Confirms a `notification_read` with the same id.
    NotificationReadAck(ReadMessage),

    Pong(PongMessage),

    Error(ErrorMessage),
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.to_string(),
            message: message.into(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now(),
        })
    }
}

impl From<Delivery> for ServerMessage {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Notification(n) => ServerMessage::Notification(n),
            Delivery::SystemNotification(n) => ServerMessage::SystemNotification(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedMessage {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthErrorMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMessage {
    pub team_id: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMessage {
    pub id: NotificationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongMessage {
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

// ============================================
// Client → Server Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Authenticate(AuthenticateMessage),

    JoinTeam(TeamMessage),

    LeaveTeam(TeamMessage),

    /// The user read a notification. Answered with `notification_read_ack`.
    NotificationRead(ReadMessage),

    /// Application-level heartbeat.
    Ping,
}

/// Handshake request. `token` is the opaque identity token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateMessage {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub token: String,
}

impl std::fmt::Debug for AuthenticateMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateMessage")
            .field("user_id", &self.user_id)
            .field("team_id", &self.team_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
