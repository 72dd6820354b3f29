//! Fallback stream transport (server-sent events).
//!
//! One request per stream. The task reports the handshake, every decoded
//! message, and exactly one terminal [`StreamEvent::Closed`]. A server
//! `timeout` ends the stream like any other failure so the session
//! reconnects. The event source's own retry is disabled; reconnects belong
//! to the session's `ReconnectController`.

use std::time::Duration;

use futures::StreamExt;
use reqwest_eventsource::{retry::Never, Error as EventSourceError, Event, EventSource};
use secrecy::{ExposeSecret, Secret};
use tokio::task::JoinHandle;

use crate::adapters::sse::StreamMessage;
use crate::domain::foundation::TeamId;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Opened,
    Message(StreamMessage),
    Closed(StreamFailure),
}

/// Why a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The relay rejected the identity token (HTTP 401).
    Unauthorized(String),
    /// The relay closed the stream with `timeout`.
    ServerTimeout,
    Transport(String),
}

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamFailure::Unauthorized(message) => write!(f, "unauthorized: {}", message),
            StreamFailure::ServerTimeout => write!(f, "stream closed by server timeout"),
            StreamFailure::Transport(message) => write!(f, "{}", message),
        }
    }
}

/// Parameters for one stream request.
pub struct StreamRequest {
    pub url: String,
    pub token: Secret<String>,
    pub team_id: Option<TeamId>,
    /// Silence longer than this ends the stream.
    pub liveness_timeout: Duration,
}

/// Handle to a live stream task. Dropping it aborts the task.
#[derive(Debug)]
pub struct FallbackStream {
    task: JoinHandle<()>,
}

impl FallbackStream {
    pub fn open<F>(http: reqwest::Client, request: StreamRequest, sink: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        let task = tokio::spawn(async move {
            let failure = run(http, request, &sink).await;
            sink(StreamEvent::Closed(failure));
        });
        Self { task }
    }
}

impl Drop for FallbackStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F>(http: reqwest::Client, request: StreamRequest, sink: &F) -> StreamFailure
where
    F: Fn(StreamEvent),
{
    let mut builder = http
        .get(&request.url)
        .query(&[("token", request.token.expose_secret().as_str())]);
    if let Some(team_id) = &request.team_id {
        builder = builder.query(&[("teamId", team_id.as_str())]);
    }

    let mut source = match EventSource::new(builder) {
        Ok(source) => source,
        Err(e) => return StreamFailure::Transport(format!("invalid stream request: {}", e)),
    };
    source.set_retry_policy(Box::new(Never));

    let failure = loop {
        let next = match tokio::time::timeout(request.liveness_timeout, source.next()).await {
            Ok(next) => next,
            Err(_) => {
                break StreamFailure::Transport(format!(
                    "no message within {}s",
                    request.liveness_timeout.as_secs()
                ))
            }
        };

        match next {
            Some(Ok(Event::Open)) => sink(StreamEvent::Opened),
            Some(Ok(Event::Message(event))) => {
                match serde_json::from_str::<StreamMessage>(&event.data) {
                    Ok(StreamMessage::Timeout) => break StreamFailure::ServerTimeout,
                    Ok(message) => sink(StreamEvent::Message(message)),
                    Err(e) => tracing::warn!(error = %e, "Dropping malformed stream message"),
                }
            }
            Some(Err(EventSourceError::InvalidStatusCode(status, _)))
                if status == reqwest::StatusCode::UNAUTHORIZED =>
            {
                break StreamFailure::Unauthorized(status.to_string())
            }
            Some(Err(EventSourceError::StreamEnded)) | None => {
                break StreamFailure::Transport("stream ended".to_string())
            }
            Some(Err(e)) => break StreamFailure::Transport(e.to_string()),
        }
    };

    source.close();
    failure
}
