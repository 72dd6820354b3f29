//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events
//!
//! ## Identity
//!
//! - `SessionValidator` - Identity-token validation for both transports
//!
//! ## Client Hooks
//!
//! - `NotificationObserver` - Injected observer notified by the client core

mod event_publisher;
mod event_subscriber;
mod notification_observer;
mod session_validator;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use notification_observer::{NoopObserver, NotificationObserver};
pub use session_validator::SessionValidator;
