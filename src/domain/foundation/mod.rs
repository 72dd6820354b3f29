//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the notification relay.

mod auth;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{ClientId, NotificationId, TeamId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
