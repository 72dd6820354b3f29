//! HTTP handlers for producer ingestion and health.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;

use crate::adapters::http::error::{domain_error_response, ErrorResponse};
use crate::adapters::websocket::RoomManager;
use crate::application::handlers::{PublishNotificationHandler, PublishSystemNotificationHandler};
use crate::ports::EventPublisher;

use super::dto::{
    AcceptedResponse, HealthResponse, PublishNotificationRequest, PublishSystemNotificationRequest,
};

pub const PRODUCER_KEY_HEADER: &str = "x-producer-key";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for ingestion and health endpoints.
#[derive(Clone)]
pub struct ProducerAppState {
    pub event_publisher: Arc<dyn EventPublisher>,
    pub rooms: Arc<RoomManager>,
    /// When set, producers must present it in `x-producer-key`.
    pub producer_key: Option<Arc<Secret<String>>>,
}

impl ProducerAppState {
    pub fn new(event_publisher: Arc<dyn EventPublisher>, rooms: Arc<RoomManager>) -> Self {
        Self {
            event_publisher,
            rooms,
            producer_key: None,
        }
    }

    pub fn with_producer_key(mut self, key: Secret<String>) -> Self {
        self.producer_key = Some(Arc::new(key));
        self
    }

    pub fn publish_notification_handler(&self) -> PublishNotificationHandler {
        PublishNotificationHandler::new(self.event_publisher.clone())
    }

    pub fn publish_system_notification_handler(&self) -> PublishSystemNotificationHandler {
        PublishSystemNotificationHandler::new(self.event_publisher.clone())
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some(expected) = &self.producer_key else {
            return Ok(());
        };
        let presented = headers
            .get(PRODUCER_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        match presented {
            Some(key) if producer_key_matches(key, expected) => Ok(()),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::unauthorized("Invalid producer key")),
            )
                .into_response()),
        }
    }
}

/// Constant-time comparison of a presented key against the configured one.
fn producer_key_matches(presented: &str, expected: &Secret<String>) -> bool {
    presented
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into()
}

fn correlation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/internal/notifications
pub async fn publish_notification(
    State(state): State<ProducerAppState>,
    headers: HeaderMap,
    Json(request): Json<PublishNotificationRequest>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    match state
        .publish_notification_handler()
        .handle(request.into(), correlation_id(&headers))
        .await
    {
        Ok(result) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                id: result.notification.id,
            }),
        )
            .into_response(),
        Err(e) => domain_error_response(e),
    }
}

/// POST /api/internal/system-notifications
pub async fn publish_system_notification(
    State(state): State<ProducerAppState>,
    headers: HeaderMap,
    Json(request): Json<PublishSystemNotificationRequest>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    match state
        .publish_system_notification_handler()
        .handle(request.into(), correlation_id(&headers))
        .await
    {
        Ok(result) => {
            (StatusCode::ACCEPTED, Json(AcceptedResponse { id: result.id })).into_response()
        }
        Err(e) => domain_error_response(e),
    }
}

/// GET /health
pub async fn health(State(state): State<ProducerAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.rooms.total_client_count().await,
        rooms: state.rooms.room_count().await,
    })
}
