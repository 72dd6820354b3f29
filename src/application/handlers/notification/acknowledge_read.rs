//! AcknowledgeReadHandler - forwards read acknowledgements to the bus.
//!
//! The relay keeps no read-state. Whatever persists notifications
//! subscribes to `notification.read`.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, NotificationId, UserId};
use crate::domain::notification::NotificationRead;
use crate::ports::EventPublisher;

use super::envelope_for;

#[derive(Debug, Clone)]
pub struct AcknowledgeReadCommand {
    pub notification_id: NotificationId,
    pub user_id: UserId,
}

pub struct AcknowledgeReadHandler {
    event_publisher: Arc<dyn EventPublisher>,
}

impl AcknowledgeReadHandler {
    pub fn new(event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self { event_publisher }
    }

    pub async fn handle(&self, cmd: AcknowledgeReadCommand) -> Result<NotificationRead, DomainError> {
        let event = NotificationRead::new(cmd.notification_id, cmd.user_id);
        let envelope = envelope_for(&event)?.with_user_id(event.user_id.to_string());

        self.event_publisher.publish(envelope).await?;

        tracing::debug!(
            notification_id = %event.notification_id,
            user_id = %event.user_id,
            "Read acknowledged"
        );
        Ok(event)
    }
}
