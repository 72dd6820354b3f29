//! Fallback stream endpoint.
//!
//! `GET {stream_path}?token=…&teamId=…` validates the identity token before
//! the stream opens (401 on failure), registers the connection in the shared
//! `RoomManager`, then streams:
//!
//! 1. `connected`
//! 2. room deliveries and a `heartbeat` every heartbeat interval
//! 3. `timeout` once the maximum duration elapses, then closes
//!
//! The registration is released when the response stream is dropped, which
//! covers both client disconnects and the server-side timeout.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

use crate::adapters::http::error::{auth_error_response, ErrorResponse};
use crate::adapters::websocket::{Delivery, RoomManager};
use crate::domain::foundation::{ClientId, TeamId, Timestamp};
use crate::domain::notification::TransportKind;
use crate::ports::SessionValidator;

use super::messages::StreamMessage;

pub const DEFAULT_STREAM_HEARTBEAT: Duration = Duration::from_secs(30);
pub const DEFAULT_STREAM_MAX_DURATION: Duration = Duration::from_secs(300);

/// State required for the fallback stream endpoint.
#[derive(Clone)]
pub struct EventStreamState {
    pub rooms: Arc<RoomManager>,
    pub validator: Arc<dyn SessionValidator>,
    pub heartbeat_interval: Duration,
    pub max_duration: Duration,
}

impl EventStreamState {
    pub fn new(rooms: Arc<RoomManager>, validator: Arc<dyn SessionValidator>) -> Self {
        Self {
            rooms,
            validator,
            heartbeat_interval: DEFAULT_STREAM_HEARTBEAT,
            max_duration: DEFAULT_STREAM_MAX_DURATION,
        }
    }

    pub fn with_timing(mut self, heartbeat_interval: Duration, max_duration: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self.max_duration = max_duration;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

/// GET {stream_path} - open the fallback stream.
pub async fn stream_handler(
    State(state): State<EventStreamState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::unauthorized("Missing token")),
        )
            .into_response();
    };

    let user = match state.validator.validate(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Stream authentication rejected");
            return auth_error_response(&e);
        }
    };

    if let Some(team_id) = &query.team_id {
        if !user.can_join(team_id) {
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::forbidden("Not a member of team")),
            )
                .into_response();
        }
    }

    let client_id = ClientId::new();
    let deliveries = state
        .rooms
        .register(client_id, user.id.clone(), TransportKind::Fallback)
        .await;
    if let Some(team_id) = query.team_id {
        state.rooms.join_team(&client_id, team_id).await;
    }

    tracing::info!(client_id = %client_id, user_id = %user.id, "Stream opened");

    let registration = Registration {
        rooms: state.rooms.clone(),
        client_id,
    };
    Sse::new(event_stream(
        registration,
        deliveries,
        state.heartbeat_interval,
        state.max_duration,
    ))
    .into_response()
}

/// Leaves every room when the stream is dropped.
struct Registration {
    rooms: Arc<RoomManager>,
    client_id: ClientId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let rooms = self.rooms.clone();
        let client_id = self.client_id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                rooms.leave(&client_id).await;
                tracing::debug!(client_id = %client_id, "Stream closed");
            });
        }
    }
}

enum Phase {
    Greeting,
    Streaming,
    Finished,
}

struct Cursor {
    registration: Registration,
    deliveries: mpsc::Receiver<Delivery>,
    heartbeat: Interval,
    deadline: Pin<Box<Sleep>>,
    phase: Phase,
}

enum Step {
    Deliver(Delivery),
    Heartbeat,
    Timeout,
    Closed,
}

fn event_stream(
    registration: Registration,
    deliveries: mpsc::Receiver<Delivery>,
    heartbeat_interval: Duration,
    max_duration: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut heartbeat =
        tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let cursor = Cursor {
        registration,
        deliveries,
        heartbeat,
        deadline: Box::pin(tokio::time::sleep(max_duration)),
        phase: Phase::Greeting,
    };

    stream::unfold(cursor, |mut cursor| async move {
        let message = match cursor.phase {
            Phase::Finished => return None,
            Phase::Greeting => {
                cursor.phase = Phase::Streaming;
                StreamMessage::Connected {
                    client_id: cursor.registration.client_id,
                    timestamp: Timestamp::now(),
                }
            }
            Phase::Streaming => {
                let step = tokio::select! {
                    delivery = cursor.deliveries.recv() => match delivery {
                        Some(delivery) => Step::Deliver(delivery),
                        None => Step::Closed,
                    },
                    _ = cursor.heartbeat.tick() => Step::Heartbeat,
                    _ = cursor.deadline.as_mut() => Step::Timeout,
                };
                match step {
                    Step::Deliver(delivery) => delivery.into(),
                    Step::Heartbeat => StreamMessage::Heartbeat {
                        timestamp: Timestamp::now(),
                    },
                    Step::Timeout => {
                        cursor.phase = Phase::Finished;
                        StreamMessage::Timeout
                    }
                    Step::Closed => return None,
                }
            }
        };

        Some((Ok(to_event(&message)), cursor))
    })
}

fn to_event(message: &StreamMessage) -> Event {
    Event::default().json_data(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode stream message");
        Event::default().comment("encode error")
    })
}

/// Create the router for the fallback stream endpoint.
pub fn stream_router(path: &str) -> axum::Router<EventStreamState> {
    use axum::routing::get;

    axum::Router::new().route(path, get(stream_handler))
}
