//! HTTP DTOs for producer ingestion and health endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::application::handlers::{PublishNotificationCommand, PublishSystemNotificationCommand};
use crate::domain::foundation::{NotificationId, TeamId, Timestamp, UserId};
use crate::domain::notification::{NotificationType, SystemLevel};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to publish a per-user notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishNotificationRequest {
    /// Producer-assigned id; generated when absent.
    #[serde(default)]
    pub id: Option<NotificationId>,
    pub user_id: UserId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl From<PublishNotificationRequest> for PublishNotificationCommand {
    fn from(req: PublishNotificationRequest) -> Self {
        Self {
            id: req.id,
            user_id: req.user_id,
            team_id: req.team_id,
            kind: req.kind,
            title: req.title,
            message: req.message,
            payload: req.data,
            occurred_at: req.timestamp,
        }
    }
}

/// Request to publish a system-wide or team-wide alert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSystemNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: SystemLevel,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

impl From<PublishSystemNotificationRequest> for PublishSystemNotificationCommand {
    fn from(req: PublishSystemNotificationRequest) -> Self {
        Self {
            title: req.title,
            message: req.message,
            level: req.level,
            team_id: req.team_id,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Returned with 202 once the event is on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub id: NotificationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub rooms: usize,
}
