//! PublishSystemNotificationHandler - system-wide or team-scoped alerts.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, NotificationId, TeamId};
use crate::domain::notification::{SystemLevel, SystemNotification, SystemNotificationCreated};
use crate::ports::EventPublisher;

use super::envelope_for;

#[derive(Debug, Clone)]
pub struct PublishSystemNotificationCommand {
    pub title: String,
    pub message: String,
    pub level: SystemLevel,
    /// Restricts the alert to one team room. Everyone otherwise.
    pub team_id: Option<TeamId>,
}

#[derive(Debug, Clone)]
pub struct PublishSystemNotificationResult {
    pub id: NotificationId,
    pub event: SystemNotificationCreated,
}

pub struct PublishSystemNotificationHandler {
    event_publisher: Arc<dyn EventPublisher>,
}

impl PublishSystemNotificationHandler {
    pub fn new(event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self { event_publisher }
    }

    pub async fn handle(
        &self,
        cmd: PublishSystemNotificationCommand,
        correlation_id: Option<String>,
    ) -> Result<PublishSystemNotificationResult, DomainError> {
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title", "Title cannot be empty"));
        }

        let alert = SystemNotification::new(cmd.title, cmd.message, cmd.level);
        let id = alert.id.clone();
        let event = SystemNotificationCreated::new(alert, cmd.team_id);

        let mut envelope = envelope_for(&event)?;
        if let Some(correlation_id) = correlation_id {
            envelope = envelope.with_correlation_id(correlation_id);
        }
        self.event_publisher.publish(envelope).await?;

        tracing::info!(alert_id = %id, level = ?cmd.level, "System notification published");

        Ok(PublishSystemNotificationResult { id, event })
    }
}
