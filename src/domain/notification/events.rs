//! Domain events flowing between producers, the relay, and the external store.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, EventId, NotificationId, TeamId, Timestamp, UserId};

use super::{Notification, SystemNotification};

pub const NOTIFICATION_CREATED: &str = "notification.created";
pub const SYSTEM_NOTIFICATION_CREATED: &str = "system_notification.created";
pub const NOTIFICATION_READ: &str = "notification.read";

/// A producer created a notification for a user, optionally also addressed
/// to everyone in a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCreated {
    pub event_id: EventId,
    pub notification: Notification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
}

impl NotificationCreated {
    pub fn new(notification: Notification, team_id: Option<TeamId>) -> Self {
        Self {
            event_id: EventId::new(),
            notification,
            team_id,
        }
    }
}

impl DomainEvent for NotificationCreated {
    fn event_type(&self) -> &'static str {
        NOTIFICATION_CREATED
    }

    fn aggregate_id(&self) -> String {
        self.notification.id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Notification"
    }

    fn occurred_at(&self) -> Timestamp {
        self.notification.occurred_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}

/// A system-wide alert. With a team it is scoped to that team's room,
/// otherwise every live connection receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNotificationCreated {
    pub event_id: EventId,
    pub notification: SystemNotification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
}

impl SystemNotificationCreated {
    pub fn new(notification: SystemNotification, team_id: Option<TeamId>) -> Self {
        Self {
            event_id: EventId::new(),
            notification,
            team_id,
        }
    }
}

impl DomainEvent for SystemNotificationCreated {
    fn event_type(&self) -> &'static str {
        SYSTEM_NOTIFICATION_CREATED
    }

    fn aggregate_id(&self) -> String {
        self.notification.id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "SystemNotification"
    }

    fn occurred_at(&self) -> Timestamp {
        self.notification.timestamp
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}

/// A user acknowledged a notification over the primary channel.
///
/// Consumed by whatever persists read-state; the relay itself keeps none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRead {
    pub event_id: EventId,
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub read_at: Timestamp,
}

impl NotificationRead {
    pub fn new(notification_id: NotificationId, user_id: UserId) -> Self {
        Self {
            event_id: EventId::new(),
            notification_id,
            user_id,
            read_at: Timestamp::now(),
        }
    }
}

impl DomainEvent for NotificationRead {
    fn event_type(&self) -> &'static str {
        NOTIFICATION_READ
    }

    fn aggregate_id(&self) -> String {
        self.notification_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Notification"
    }

    fn occurred_at(&self) -> Timestamp {
        self.read_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}
