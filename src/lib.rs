//! Notification Relay - real-time notification delivery
//!
//! The broadcast server pushes producer events to connected clients over a
//! primary WebSocket channel and a fallback SSE stream. The client core keeps
//! both transports alive and reconciles what they deliver into one
//! deduplicated, time-ordered feed with monotonic read state.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
pub mod server;
pub mod telemetry;
