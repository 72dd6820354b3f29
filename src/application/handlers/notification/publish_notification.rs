//! PublishNotificationHandler - accepts a producer notification for delivery.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::domain::foundation::{DomainError, NotificationId, TeamId, Timestamp, UserId};
use crate::domain::notification::{Notification, NotificationCreated, NotificationType};
use crate::ports::EventPublisher;

use super::envelope_for;

/// Command to publish a notification for a user, optionally also to a team.
#[derive(Debug, Clone)]
pub struct PublishNotificationCommand {
    /// Producer-assigned id. Generated when absent.
    pub id: Option<NotificationId>,
    pub user_id: UserId,
    pub team_id: Option<TeamId>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub payload: Option<JsonValue>,
    /// Defaults to now.
    pub occurred_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct PublishNotificationResult {
    pub notification: Notification,
    pub event: NotificationCreated,
}

pub struct PublishNotificationHandler {
    event_publisher: Arc<dyn EventPublisher>,
}

impl PublishNotificationHandler {
    pub fn new(event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self { event_publisher }
    }

    pub async fn handle(
        &self,
        cmd: PublishNotificationCommand,
        correlation_id: Option<String>,
    ) -> Result<PublishNotificationResult, DomainError> {
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title", "Title cannot be empty"));
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("message", "Message cannot be empty"));
        }

        let mut notification = Notification::new(
            cmd.id.unwrap_or_else(NotificationId::generate),
            cmd.user_id,
            cmd.kind,
            cmd.title,
            cmd.message,
        );
        if let Some(payload) = cmd.payload {
            notification = notification.with_payload(payload);
        }
        if let Some(at) = cmd.occurred_at {
            notification = notification.occurred_at(at);
        }

        let event = NotificationCreated::new(notification.clone(), cmd.team_id);
        let mut envelope = envelope_for(&event)?.with_user_id(notification.user_id.to_string());
        if let Some(correlation_id) = correlation_id {
            envelope = envelope.with_correlation_id(correlation_id);
        }

        self.event_publisher.publish(envelope).await?;

        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            kind = %notification.kind,
            "Notification published"
        );

        Ok(PublishNotificationResult {
            notification,
            event,
        })
    }
}
