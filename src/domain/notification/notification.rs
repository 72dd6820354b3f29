//! Notification value types shared by the server and the client core.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::domain::foundation::{NotificationId, Timestamp, UserId};

/// Which transport delivered a record to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bidirectional WebSocket channel.
    Primary,
    /// Server-sent events stream.
    Fallback,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Primary => write!(f, "primary"),
            TransportKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Closed set of notification categories emitted by producers.
///
/// Unknown values fail deserialization; transports treat them as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PostScheduled,
    PostPublished,
    PostFailed,
    ApprovalRequired,
    ApprovalGranted,
    ApprovalRejected,
    AccountTokenExpired,
    SystemAlert,
    TeamInvitation,
}

impl NotificationType {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PostScheduled => "post_scheduled",
            NotificationType::PostPublished => "post_published",
            NotificationType::PostFailed => "post_failed",
            NotificationType::ApprovalRequired => "approval_required",
            NotificationType::ApprovalGranted => "approval_granted",
            NotificationType::ApprovalRejected => "approval_rejected",
            NotificationType::AccountTokenExpired => "account_token_expired",
            NotificationType::SystemAlert => "system_alert",
            NotificationType::TeamInvitation => "team_invitation",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-user notification.
///
/// Wire shape: `{id, userId, type, title, message, data?, read, timestamp}`.
/// `source_channel` is local bookkeeping only and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    /// Opaque producer-defined metadata.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "timestamp")]
    pub occurred_at: Timestamp,
    #[serde(skip)]
    pub source_channel: Option<TransportKind>,
}

impl Notification {
    /// Creates an unread notification occurring now.
    pub fn new(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            payload: None,
            read: false,
            occurred_at: Timestamp::now(),
            source_channel: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn occurred_at(mut self, at: Timestamp) -> Self {
        self.occurred_at = at;
        self
    }

    pub fn mark_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// Tags the record with the transport that delivered it.
    pub fn delivered_via(mut self, transport: TransportKind) -> Self {
        self.source_channel = Some(transport);
        self
    }
}

/// Severity of a system-wide notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemLevel {
    #[default]
    Info,
    Warning,
    Critical,
}

/// Broadcast notification not addressed to a single user.
///
/// The relay stamps an id so a client receiving the same alert over both
/// transports can show it once; it never enters the per-user feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: SystemLevel,
    pub timestamp: Timestamp,
}

impl SystemNotification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, level: SystemLevel) -> Self {
        Self {
            id: NotificationId::generate(),
            title: title.into(),
            message: message.into(),
            level,
            timestamp: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Notification {
        Notification::new(
            NotificationId::new("n1").unwrap(),
            UserId::new("user-1").unwrap(),
            NotificationType::PostPublished,
            "Post published",
            "Your post is live",
        )
        .occurred_at(Timestamp::from_unix_secs(1705276800))
        .with_payload(json!({"postId": "p-9"}))
    }

    #[test]
    fn notification_serializes_with_wire_names() {
        let value = serde_json::to_value(sample().delivered_via(TransportKind::Primary)).unwrap();

        assert_eq!(value["id"], "n1");
        assert_eq!(value["userId"], "user-1");
        assert_eq!(value["type"], "post_published");
        assert_eq!(value["data"]["postId"], "p-9");
        assert_eq!(value["read"], false);
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-01-15"));
        assert!(value.get("sourceChannel").is_none());
    }

    #[test]
    fn notification_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "n2",
            "userId": "user-1",
            "type": "approval_required",
            "title": "Approval needed",
            "message": "Review the draft",
            "timestamp": "2024-01-15T10:30:00Z"
        }"#;

        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.kind, NotificationType::ApprovalRequired);
        assert!(!notification.read);
        assert!(notification.payload.is_none());
        assert!(notification.source_channel.is_none());
    }

    #[test]
    fn unknown_notification_type_is_rejected() {
        let json = r#"{"id":"n3","userId":"u","type":"mystery","title":"t","message":"m","timestamp":"2024-01-15T10:30:00Z"}"#;
        assert!(serde_json::from_str::<Notification>(json).is_err());
    }

    #[test]
    fn empty_id_is_rejected() {
        let json = r#"{"id":"","userId":"u","type":"post_failed","title":"t","message":"m","timestamp":"2024-01-15T10:30:00Z"}"#;
        assert!(serde_json::from_str::<Notification>(json).is_err());
    }

    #[test]
    fn type_display_matches_wire_name() {
        let json = serde_json::to_string(&NotificationType::AccountTokenExpired).unwrap();
        assert_eq!(json, format!("\"{}\"", NotificationType::AccountTokenExpired));
    }

    #[test]
    fn system_notification_defaults_to_info_level() {
        let json = r#"{"id":"s1","title":"Maintenance","message":"Tonight","timestamp":"2024-01-15T10:30:00Z"}"#;
        let alert: SystemNotification = serde_json::from_str(json).unwrap();
        assert_eq!(alert.level, SystemLevel::Info);
    }
}
