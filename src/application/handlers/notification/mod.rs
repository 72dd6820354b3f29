//! Notification command handlers.
//!
//! Producers publish through these; the relay's bridge and the external
//! store consume the resulting events from the bus.

mod acknowledge_read;
mod publish_notification;
mod publish_system_notification;

pub use acknowledge_read::{AcknowledgeReadCommand, AcknowledgeReadHandler};
pub use publish_notification::{
    PublishNotificationCommand, PublishNotificationHandler, PublishNotificationResult,
};
pub use publish_system_notification::{
    PublishSystemNotificationCommand, PublishSystemNotificationHandler,
    PublishSystemNotificationResult,
};

use serde::Serialize;

use crate::domain::foundation::{DomainError, DomainEvent, ErrorCode, EventEnvelope};

fn envelope_for<E: DomainEvent + Serialize>(event: &E) -> Result<EventEnvelope, DomainError> {
    EventEnvelope::from_event(event).map_err(|e| {
        DomainError::new(ErrorCode::InternalError, "Failed to serialize event")
            .with_detail("event_type", event.event_type())
            .with_detail("error", e.to_string())
    })
}
