//! Notification module - per-user notifications, system alerts, and the
//! reconciliation engine that merges them.

mod events;
mod feed;
mod notification;

pub use events::{
    NotificationCreated, NotificationRead, SystemNotificationCreated, NOTIFICATION_CREATED,
    NOTIFICATION_READ, SYSTEM_NOTIFICATION_CREATED,
};
pub use feed::{
    reconcile, FeedChange, FeedMessage, MergeOutcome, NotificationFeed, DEFAULT_FEED_CAPACITY,
};
pub use notification::{
    Notification, NotificationType, SystemLevel, SystemNotification, TransportKind,
};
