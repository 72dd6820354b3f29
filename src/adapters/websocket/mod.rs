//! Broadcast server: primary channel and the shared room registry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Event Bus                                    │
//! │   notification.created │ system_notification.created                 │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ subscribes
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    NotificationBridge                                │
//! │   - Decodes producer events                                          │
//! │   - Resolves user and team rooms                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ broadcasts
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomManager                                     │
//! │   Room: user:u1        Room: team:t9                                 │
//! │   ├── client-a (ws)    ├── client-a (ws)                             │
//! │   └── client-b (sse)   └── client-c (ws)                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Primary channel protocol types
//! - [`rooms`] - Room registry shared with the SSE endpoint
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`event_bridge`] - Bridge between event bus and rooms

pub mod event_bridge;
pub mod handler;
pub mod messages;
pub mod rooms;

pub use event_bridge::{NotificationBridge, RELAYED_EVENT_TYPES};
pub use handler::{websocket_router, ws_handler, WebSocketState, DEFAULT_AUTHENTICATE_TIMEOUT};
pub use messages::{
    AuthErrorMessage, AuthenticateMessage, AuthenticatedMessage, ClientMessage, ErrorMessage,
    PongMessage, ReadMessage, ServerMessage, TeamMessage,
};
pub use rooms::{Delivery, Room, RoomManager, DEFAULT_CONNECTION_BUFFER};
