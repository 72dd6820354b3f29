//! Event bridge connecting producer events to live connections.
//!
//! # Event Flow
//!
//! ```text
//! notification.created ──► NotificationBridge ──► rooms {user:U, team:T}
//! system_notification.created ──► NotificationBridge ──► team:T or everyone
//! ```
//!
//! The bridge delivers the same payload to WebSocket and SSE connections;
//! each connection's writer renders its own wire format.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::domain::notification::{
    NotificationCreated, SystemNotificationCreated, NOTIFICATION_CREATED,
    SYSTEM_NOTIFICATION_CREATED,
};
use crate::ports::{EventHandler, EventSubscriber};

use super::rooms::{Delivery, Room, RoomManager};

/// Event types the bridge relays.
pub const RELAYED_EVENT_TYPES: &[&str] = &[NOTIFICATION_CREATED, SYSTEM_NOTIFICATION_CREATED];

/// Routes bus events to rooms.
pub struct NotificationBridge {
    rooms: Arc<RoomManager>,
}

impl NotificationBridge {
    pub fn new(rooms: Arc<RoomManager>) -> Self {
        Self { rooms }
    }

    pub fn new_shared(rooms: Arc<RoomManager>) -> Arc<Self> {
        Arc::new(Self::new(rooms))
    }

    /// Subscribes this bridge to every relayed event type.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let bridge = NotificationBridge::new_shared(rooms);
    /// bridge.register(&*event_bus);
    /// ```
    pub fn register(self: &Arc<Self>, subscriber: &dyn EventSubscriber) {
        subscriber.subscribe_all(RELAYED_EVENT_TYPES, self.clone());
    }

    async fn relay_notification(&self, event: &EventEnvelope) -> Result<usize, DomainError> {
        let created: NotificationCreated = decode(event)?;

        let mut rooms = vec![Room::User(created.notification.user_id.clone())];
        if let Some(team_id) = created.team_id {
            rooms.push(Room::Team(team_id));
        }

        Ok(self
            .rooms
            .broadcast(&rooms, Delivery::Notification(created.notification))
            .await)
    }

    async fn relay_system_notification(&self, event: &EventEnvelope) -> Result<usize, DomainError> {
        let created: SystemNotificationCreated = decode(event)?;
        let delivery = Delivery::SystemNotification(created.notification);

        Ok(match created.team_id {
            Some(team_id) => self.rooms.broadcast(&[Room::Team(team_id)], delivery).await,
            None => self.rooms.broadcast_all(delivery).await,
        })
    }
}

fn decode<T: for<'de> serde::Deserialize<'de>>(event: &EventEnvelope) -> Result<T, DomainError> {
    event.payload_as().map_err(|e| {
        DomainError::new(ErrorCode::MalformedMessage, "Event payload does not match its type")
            .with_detail("event_type", event.event_type.clone())
            .with_detail("error", e.to_string())
    })
}

#[async_trait]
impl EventHandler for NotificationBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let delivered = match event.event_type.as_str() {
            NOTIFICATION_CREATED => self.relay_notification(&event).await?,
            SYSTEM_NOTIFICATION_CREATED => self.relay_system_notification(&event).await?,
            _ => return Ok(()),
        };

        tracing::debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            recipients = delivered,
            "Event relayed"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationBridge"
    }
}
