//! EventSubscriber port - Interface for subscribing to domain events.
//!
//! Handlers register interest in event types without knowing about the
//! underlying transport mechanism.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Idempotent** - Safe to call multiple times with same event
/// - **Quick** - Never wait on a slow consumer
/// - **Isolated** - Errors don't affect other handlers
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl EventHandler for NotificationBridge {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let created: NotificationCreated = event.payload_as()?;
///         self.rooms.broadcast(&audience, delivery).await;
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "NotificationBridge"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
///
/// # Example
///
/// ```ignore
/// subscriber.subscribe_all(&[NOTIFICATION_CREATED, SYSTEM_NOTIFICATION_CREATED], bridge);
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    ///
    /// The same handler instance is invoked for any matching event type.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
