//! NotificationObserver port - hooks the client core calls as it works.
//!
//! The session actor invokes these synchronously from its own task, so
//! implementations must return quickly and must not block. Every method has
//! a no-op default; implement only what you need.

use crate::domain::connection::{ConnectionError, ConnectionStatus};
use crate::domain::foundation::NotificationId;
use crate::domain::notification::{Notification, SystemNotification};

/// Observer injected into a `NotificationSession`.
pub trait NotificationObserver: Send + Sync {
    /// The combined connection status changed.
    fn on_status_changed(&self, _status: &ConnectionStatus) {}

    /// A notification was newly added to the feed. Duplicates are not reported.
    fn on_notification(&self, _notification: &Notification) {}

    /// A system alert arrived for the first time.
    fn on_system_notification(&self, _alert: &SystemNotification) {}

    /// The relay confirmed a read acknowledgement.
    fn on_read_acknowledged(&self, _id: &NotificationId) {}

    /// A transport or authentication failure occurred.
    fn on_error(&self, _error: &ConnectionError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NotificationObserver for NoopObserver {}
