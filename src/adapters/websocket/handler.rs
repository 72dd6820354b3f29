//! WebSocket upgrade handler for the primary channel.
//!
//! Connection lifecycle:
//! 1. Upgrade to WebSocket and start the writer task
//! 2. Wait for `authenticate` (bounded by the authenticate timeout)
//! 3. Validate the identity token, register in the user room, optionally
//!    join the team room, reply `authenticated`
//! 4. Serve join/leave, read acknowledgements and pings until disconnect
//! 5. Leave every room
//!
//! All writes go through one writer task so replies and room deliveries
//! never interleave mid-frame.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::{AcknowledgeReadCommand, AcknowledgeReadHandler};
use crate::domain::foundation::{AuthError, AuthenticatedUser, ClientId, ErrorCode};
use crate::domain::notification::TransportKind;
use crate::ports::SessionValidator;

use super::messages::{
    AuthErrorMessage, AuthenticateMessage, AuthenticatedMessage, ClientMessage, ReadMessage,
    ServerMessage, TeamMessage,
};
use super::rooms::{Delivery, RoomManager};

/// Default time a fresh socket has to send `authenticate`.
pub const DEFAULT_AUTHENTICATE_TIMEOUT: Duration = Duration::from_secs(10);

const OUTBOUND_BUFFER: usize = 32;
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub rooms: Arc<RoomManager>,
    pub validator: Arc<dyn SessionValidator>,
    pub acknowledge_read: Arc<AcknowledgeReadHandler>,
    pub authenticate_timeout: Duration,
}

impl WebSocketState {
    pub fn new(
        rooms: Arc<RoomManager>,
        validator: Arc<dyn SessionValidator>,
        acknowledge_read: Arc<AcknowledgeReadHandler>,
    ) -> Self {
        Self {
            rooms,
            validator,
            acknowledge_read,
            authenticate_timeout: DEFAULT_AUTHENTICATE_TIMEOUT,
        }
    }

    pub fn with_authenticate_timeout(mut self, timeout: Duration) -> Self {
        self.authenticate_timeout = timeout;
        self
    }
}

/// Handle WebSocket upgrade requests.
///
/// Authentication happens in-band with the `authenticate` event, so the
/// upgrade itself is unauthenticated.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Instructions for the writer task.
enum Outbound {
    Message(ServerMessage),
    /// Start draining room deliveries from this receiver.
    Attach(mpsc::Receiver<Delivery>),
}

/// Per-socket protocol state, owned by the reader.
struct Connection {
    client_id: ClientId,
    state: WebSocketState,
    outbound: mpsc::Sender<Outbound>,
    user: Option<AuthenticatedUser>,
}

async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sink, mut stream) = socket.split();
    let client_id = ClientId::new();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let mut writer = tokio::spawn(write_loop(sink, outbound_rx, client_id));
    let mut conn = Connection {
        client_id,
        state: state.clone(),
        outbound: outbound_tx,
        user: None,
    };

    tracing::debug!(client_id = %client_id, "WebSocket connected");

    let writer_finished = tokio::select! {
        _ = read_loop(&mut stream, &mut conn) => false,
        _ = &mut writer => true,
    };

    if conn.user.take().is_some() {
        state.rooms.leave(&client_id).await;
    }
    // Closing the outbound channel lets the writer flush and send a close frame.
    drop(conn);
    if !writer_finished && tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }

    tracing::debug!(client_id = %client_id, "WebSocket disconnected");
}

async fn read_loop(stream: &mut futures::stream::SplitStream<WebSocket>, conn: &mut Connection) {
    loop {
        let next = if conn.user.is_none() {
            match tokio::time::timeout(conn.state.authenticate_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::debug!(client_id = %conn.client_id, "No authenticate before timeout");
                    return;
                }
            }
        } else {
            stream.next().await
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                if conn.handle_text(&text).await.is_break() {
                    return;
                }
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!(client_id = %conn.client_id, "Received unsupported binary message");
            }
            Some(Ok(Message::Close(_))) | None => return,
            // Protocol ping/pong frames are answered by axum
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(client_id = %conn.client_id, error = %e, "Receive error");
                return;
            }
        }
    }
}

impl Connection {
    /// Queues a reply. Returns false once the writer is gone.
    async fn send(&self, message: ServerMessage) -> bool {
        self.outbound.send(Outbound::Message(message)).await.is_ok()
    }

    async fn handle_text(&mut self, text: &str) -> ControlFlow<()> {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(client_id = %self.client_id, error = %e, "Malformed client message");
                return self
                    .reply(ServerMessage::error(ErrorCode::MalformedMessage, "Malformed message"))
                    .await;
            }
        };

        match (message, self.user.clone()) {
            (ClientMessage::Ping, _) => self.reply(ServerMessage::pong()).await,

            (ClientMessage::Authenticate(auth), None) => self.authenticate(auth).await,

            (ClientMessage::Authenticate(_), Some(_)) => {
                self.reply(ServerMessage::error(
                    ErrorCode::InvalidStateTransition,
                    "Already authenticated",
                ))
                .await
            }

            (_, None) => {
                self.reply(ServerMessage::error(
                    ErrorCode::NotAuthenticated,
                    "Authenticate first",
                ))
                .await
            }

            (ClientMessage::JoinTeam(TeamMessage { team_id }), Some(user)) => {
                if !user.can_join(&team_id) {
                    tracing::warn!(
                        client_id = %self.client_id,
                        user_id = %user.id,
                        team_id = %team_id,
                        "Team join refused"
                    );
                    return self
                        .reply(ServerMessage::error(ErrorCode::Forbidden, "Not a member of team"))
                        .await;
                }
                self.state.rooms.join_team(&self.client_id, team_id.clone()).await;
                self.reply(ServerMessage::TeamJoined(TeamMessage { team_id })).await
            }

            (ClientMessage::LeaveTeam(TeamMessage { team_id }), Some(_)) => {
                self.state.rooms.leave_team(&self.client_id, &team_id).await;
                ControlFlow::Continue(())
            }

            (ClientMessage::NotificationRead(ReadMessage { id }), Some(user)) => {
                let flow = self
                    .reply(ServerMessage::NotificationReadAck(ReadMessage { id: id.clone() }))
                    .await;
                let cmd = AcknowledgeReadCommand {
                    notification_id: id,
                    user_id: user.id,
                };
                if let Err(e) = self.state.acknowledge_read.handle(cmd).await {
                    tracing::warn!(client_id = %self.client_id, error = %e, "Read acknowledgement not published");
                }
                flow
            }
        }
    }

    async fn authenticate(&mut self, auth: AuthenticateMessage) -> ControlFlow<()> {
        let result = self
            .state
            .validator
            .validate(&auth.token)
            .await
            .and_then(|user| {
                if user.id == auth.user_id {
                    Ok(user)
                } else {
                    Err(AuthError::SubjectMismatch)
                }
            });

        let user = match result {
            Ok(user) => user,
            Err(e) if e.is_transient() => {
                tracing::warn!(client_id = %self.client_id, error = %e, "Identity check unavailable");
                self.send(ServerMessage::error(ErrorCode::InternalError, e.to_string()))
                    .await;
                return ControlFlow::Break(());
            }
            Err(e) => {
                tracing::info!(
                    client_id = %self.client_id,
                    user_id = %auth.user_id,
                    error = %e,
                    "Authentication rejected"
                );
                self.send(ServerMessage::AuthError(AuthErrorMessage {
                    message: e.to_string(),
                }))
                .await;
                return ControlFlow::Break(());
            }
        };

        let deliveries = self
            .state
            .rooms
            .register(self.client_id, user.id.clone(), TransportKind::Primary)
            .await;
        if self.outbound.send(Outbound::Attach(deliveries)).await.is_err() {
            return ControlFlow::Break(());
        }

        let team_id = match auth.team_id {
            Some(team_id) if user.can_join(&team_id) => {
                self.state.rooms.join_team(&self.client_id, team_id.clone()).await;
                Some(team_id)
            }
            Some(team_id) => {
                tracing::warn!(client_id = %self.client_id, team_id = %team_id, "Team context refused");
                None
            }
            None => None,
        };

        tracing::info!(client_id = %self.client_id, user_id = %user.id, "Client authenticated");

        let reply = ServerMessage::Authenticated(AuthenticatedMessage {
            user_id: user.id.clone(),
            team_id,
            client_id: self.client_id,
        });
        self.user = Some(user);
        self.reply(reply).await
    }

    async fn reply(&self, message: ServerMessage) -> ControlFlow<()> {
        if self.send(message).await {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }
}

enum WriterStep {
    Send(ServerMessage),
    Attach(mpsc::Receiver<Delivery>),
    Stop,
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    client_id: ClientId,
) {
    let mut deliveries: Option<mpsc::Receiver<Delivery>> = None;

    loop {
        let step = tokio::select! {
            biased;
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Message(message)) => WriterStep::Send(message),
                Some(Outbound::Attach(rx)) => WriterStep::Attach(rx),
                None => WriterStep::Stop,
            },
            delivery = next_delivery(&mut deliveries) => match delivery {
                Some(delivery) => WriterStep::Send(delivery.into()),
                None => WriterStep::Stop,
            },
        };

        match step {
            WriterStep::Send(message) => {
                if let Err(e) = send_message(&mut sink, &message).await {
                    tracing::debug!(client_id = %client_id, error = %e, "Send error, closing connection");
                    return;
                }
            }
            WriterStep::Attach(rx) => deliveries = Some(rx),
            WriterStep::Stop => break,
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

/// Next room delivery, or pending forever before authentication.
async fn next_delivery(deliveries: &mut Option<mpsc::Receiver<Delivery>>) -> Option<Delivery> {
    match deliveries {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            Ok(())
        }
    }
}

/// Create the router for the primary channel endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new().merge(websocket_router("/ws").with_state(ws_state));
/// ```
pub fn websocket_router(path: &str) -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route(path, get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::events::InMemoryEventBus;

    fn state() -> WebSocketState {
        WebSocketState::new(
            Arc::new(RoomManager::default()),
            Arc::new(MockSessionValidator::new()),
            Arc::new(AcknowledgeReadHandler::new(Arc::new(InMemoryEventBus::new()))),
        )
    }

    #[test]
    fn websocket_state_uses_default_timeout() {
        assert_eq!(state().authenticate_timeout, DEFAULT_AUTHENTICATE_TIMEOUT);
        let custom = state().with_authenticate_timeout(Duration::from_secs(1));
        assert_eq!(custom.authenticate_timeout, Duration::from_secs(1));
    }

    #[test]
    fn websocket_router_creates_route() {
        let _router: axum::Router = websocket_router("/ws").with_state(state());
    }

    #[tokio::test]
    async fn pending_delivery_never_resolves_without_receiver() {
        let mut none = None;
        let result =
            tokio::time::timeout(Duration::from_millis(20), next_delivery(&mut none)).await;
        assert!(result.is_err());
    }
}
