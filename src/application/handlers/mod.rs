//! Application handlers.
//!
//! Command handlers that validate input, build domain events, and publish
//! them through the `EventPublisher` port.

pub mod notification;

pub use notification::{
    AcknowledgeReadCommand, AcknowledgeReadHandler, PublishNotificationCommand,
    PublishNotificationHandler, PublishNotificationResult, PublishSystemNotificationCommand,
    PublishSystemNotificationHandler, PublishSystemNotificationResult,
};
