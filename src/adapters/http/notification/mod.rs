//! HTTP adapter for producer ingestion.
//!
//! Producers hand events to the relay over HTTP:
//! - `POST /api/internal/notifications` - Publish `notification.created`
//! - `POST /api/internal/system-notifications` - Publish `system_notification.created`
//! - `GET /health` - Connection and room counts

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{ProducerAppState, CORRELATION_ID_HEADER, PRODUCER_KEY_HEADER};
pub use routes::producer_router;
