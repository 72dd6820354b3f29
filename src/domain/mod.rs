//! Domain layer containing notification and connection types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `notification` - Notifications, system alerts, and the reconciliation engine
//! - `connection` - Transport lifecycle state machines and consumer status

pub mod connection;
pub mod foundation;
pub mod notification;
