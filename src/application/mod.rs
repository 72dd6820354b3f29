//! Application layer - command handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    AcknowledgeReadCommand, AcknowledgeReadHandler, PublishNotificationCommand,
    PublishNotificationHandler, PublishNotificationResult, PublishSystemNotificationCommand,
    PublishSystemNotificationHandler, PublishSystemNotificationResult,
};
