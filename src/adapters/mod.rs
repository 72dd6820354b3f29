//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Identity token validation (JWT, mock)
//! - `events` - In-process event bus
//! - `http` - Producer ingestion and health endpoints
//! - `sse` - Fallback stream endpoint
//! - `websocket` - Primary channel endpoint and room registry

pub mod auth;
pub mod events;
pub mod http;
pub mod sse;
pub mod websocket;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use events::InMemoryEventBus;
pub use sse::EventStreamState;
pub use websocket::{NotificationBridge, RoomManager, WebSocketState};
