//! Axum router configuration for producer ingestion and health.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{health, publish_notification, publish_system_notification, ProducerAppState};

/// Create the producer ingestion router.
///
/// # Routes
/// - `POST /api/internal/notifications` - Publish a per-user notification
/// - `POST /api/internal/system-notifications` - Publish a system alert
/// - `GET /health` - Liveness and registry size
pub fn producer_router() -> Router<ProducerAppState> {
    Router::new()
        .route("/api/internal/notifications", post(publish_notification))
        .route(
            "/api/internal/system-notifications",
            post(publish_system_notification),
        )
        .route("/health", get(health))
}
