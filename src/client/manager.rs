//! Connection manager for one client session.
//!
//! [`NotificationSession`] is an explicit, disposable object. It spawns one
//! actor task that owns the feed, both transports and every timer, and
//! processes commands and transport events strictly one at a time. The
//! consumer reads [`SessionSnapshot`]s from a `watch` channel.
//!
//! ```text
//!  consumer ──commands──►┌──────────────┐◄──events── PrimaryChannel (ws)
//!                        │ SessionActor │◄──events── FallbackStream (sse)
//!  consumer ◄─snapshot───└──────────────┘◄──events── Heartbeat / ReconnectController
//! ```
//!
//! Every connect attempt gets a fresh generation number. Events carry the
//! generation they were produced for, so late events from a torn-down
//! socket or stream are ignored.

use std::collections::BTreeSet;
use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::adapters::sse::StreamMessage;
use crate::adapters::websocket::{
    AuthenticateMessage, AuthenticatedMessage, ClientMessage, ReadMessage, ServerMessage,
    TeamMessage,
};
use crate::config::ClientConfig;
use crate::domain::connection::{ConnectionError, ConnectionStatus, PrimaryState, StreamState};
use crate::domain::foundation::{NotificationId, StateMachine, TeamId, UserId};
use crate::domain::notification::{
    FeedChange, FeedMessage, MergeOutcome, Notification, NotificationFeed, SystemNotification,
    TransportKind,
};
use crate::ports::NotificationObserver;

use super::fallback::{FallbackStream, StreamEvent, StreamFailure, StreamRequest};
use super::heartbeat::{Heartbeat, Liveness};
use super::primary::{PrimaryChannel, PrimaryEvent};
use super::reconnect::ReconnectController;

/// Who the session connects as.
pub struct Identity {
    pub user_id: UserId,
    pub team_id: Option<TeamId>,
    pub token: Secret<String>,
}

impl Identity {
    pub fn new(user_id: UserId, token: impl Into<String>) -> Self {
        Self {
            user_id,
            team_id: None,
            token: Secret::new(token.into()),
        }
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("team_id", &self.team_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Everything a consumer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub primary: PrimaryState,
    pub stream: StreamState,
    /// Newest first.
    pub notifications: Vec<Notification>,
    /// Newest first.
    pub alerts: Vec<SystemNotification>,
    pub unread_count: usize,
    /// Read acknowledgements not yet confirmed by the relay.
    pub pending_acks: Vec<NotificationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("notification session has shut down")]
    Closed,
}

enum Command {
    Connect,
    Disconnect,
    MarkRead(NotificationId),
    MarkAllRead,
    DismissAlert(NotificationId),
    Clear,
    RefreshToken(Secret<String>),
    Shutdown,
}

enum SessionEvent {
    Primary { generation: u64, event: PrimaryEvent },
    Stream { generation: u64, event: StreamEvent },
    HeartbeatDue { generation: u64 },
    RetryDue(TransportKind),
}

/// Handle to a running session. Dropping it tears the session down.
pub struct NotificationSession {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl NotificationSession {
    /// Spawns the session actor. Nothing connects until [`connect`](Self::connect).
    pub fn start(
        config: ClientConfig,
        identity: Identity,
        observer: Arc<dyn NotificationObserver>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(SessionSnapshot::default());

        let actor = SessionActor::new(config, identity, observer, events, snapshot_tx);
        let task = tokio::spawn(actor.run(command_rx, event_rx));

        Self {
            commands,
            snapshot,
            task: Some(task),
        }
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// Opens the primary channel and, if enabled, the fallback stream.
    /// Transports that are already connecting or connected are left alone.
    pub fn connect(&self) -> Result<(), SessionError> {
        self.send(Command::Connect)
    }

    /// Closes both transports without scheduling a reconnect.
    pub fn disconnect(&self) -> Result<(), SessionError> {
        self.send(Command::Disconnect)
    }

    pub fn mark_read(&self, id: NotificationId) -> Result<(), SessionError> {
        self.send(Command::MarkRead(id))
    }

    pub fn mark_all_read(&self) -> Result<(), SessionError> {
        self.send(Command::MarkAllRead)
    }

    /// Removes a system alert once the consumer has shown it.
    pub fn dismiss_alert(&self, id: NotificationId) -> Result<(), SessionError> {
        self.send(Command::DismissAlert(id))
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.send(Command::Clear)
    }

    /// Replaces the identity token and lifts an authentication hold.
    pub fn refresh_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::RefreshToken(Secret::new(token.into())))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until a snapshot satisfies `predicate`.
    pub async fn wait_until<P>(&self, mut predicate: P) -> Result<SessionSnapshot, SessionError>
    where
        P: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| SessionError::Closed)?
            .clone();
        Ok(snapshot)
    }

    /// Stops the actor and waits for it to release every transport and timer.
    pub async fn shutdown(mut self) -> Result<(), SessionError> {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| SessionError::Closed)?;
        }
        Ok(())
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Step {
    Command(Command),
    Event(SessionEvent),
}

struct SessionActor {
    config: ClientConfig,
    identity: Identity,
    observer: Arc<dyn NotificationObserver>,
    http: reqwest::Client,
    feed: NotificationFeed,
    /// The consumer asked to be connected.
    wanted: bool,
    primary_state: PrimaryState,
    stream_state: StreamState,
    primary: Option<PrimaryChannel>,
    stream: Option<FallbackStream>,
    primary_generation: u64,
    stream_generation: u64,
    heartbeat: Option<Heartbeat>,
    liveness: Liveness,
    primary_retry: ReconnectController,
    stream_retry: ReconnectController,
    last_error: Option<ConnectionError>,
    pending_acks: BTreeSet<NotificationId>,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    last_status: ConnectionStatus,
}

impl SessionActor {
    fn new(
        config: ClientConfig,
        identity: Identity,
        observer: Arc<dyn NotificationObserver>,
        events: mpsc::UnboundedSender<SessionEvent>,
        snapshot: watch::Sender<SessionSnapshot>,
    ) -> Self {
        let liveness = Liveness::new(config.heartbeat_interval() + config.liveness_timeout());
        Self {
            feed: NotificationFeed::new(config.cache_capacity),
            primary_retry: ReconnectController::new(config.reconnect_delay()),
            stream_retry: ReconnectController::new(config.reconnect_delay()),
            liveness,
            config,
            identity,
            observer,
            http: reqwest::Client::new(),
            wanted: false,
            primary_state: PrimaryState::Disconnected,
            stream_state: StreamState::Disconnected,
            primary: None,
            stream: None,
            primary_generation: 0,
            stream_generation: 0,
            heartbeat: None,
            last_error: None,
            pending_acks: BTreeSet::new(),
            events,
            snapshot,
            last_status: ConnectionStatus::default(),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        loop {
            let step = tokio::select! {
                command = commands.recv() => Step::Command(command.unwrap_or(Command::Shutdown)),
                Some(event) = events.recv() => Step::Event(event),
            };

            match step {
                Step::Command(Command::Shutdown) => break,
                Step::Command(command) => self.handle_command(command),
                Step::Event(event) => self.handle_event(event),
            }
            self.publish();
        }

        self.wanted = false;
        self.teardown();
        self.publish();
        tracing::debug!(user_id = %self.identity.user_id, "Notification session stopped");
    }

    // ════════════════════════════════════════════════════════════════════
    // Commands
    // ════════════════════════════════════════════════════════════════════

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                self.wanted = true;
                self.open_inactive();
            }
            Command::Disconnect => {
                self.wanted = false;
                self.teardown();
                tracing::info!(user_id = %self.identity.user_id, "Disconnected by request");
            }
            Command::MarkRead(id) => {
                // Ids outside the cache still go upstream; only cached entries
                // that were already read are skipped.
                let cached = self.feed.get(&id).is_some();
                match self.feed.apply(FeedMessage::MarkRead(id.clone())) {
                    FeedChange::MarkedRead(ids) if !ids.is_empty() => self.queue_acks(ids),
                    _ if !cached => self.queue_acks(vec![id]),
                    _ => {}
                }
            }
            Command::MarkAllRead => {
                if let FeedChange::MarkedRead(ids) = self.feed.apply(FeedMessage::MarkAllRead) {
                    self.queue_acks(ids);
                }
            }
            Command::DismissAlert(id) => {
                self.feed.dismiss_alert(&id);
            }
            Command::Clear => {
                self.feed.apply(FeedMessage::Clear);
            }
            Command::RefreshToken(token) => {
                self.identity.token = token;
                if self.auth_blocked() {
                    self.last_error = None;
                }
                if self.wanted {
                    self.open_inactive();
                }
            }
            // Handled by the run loop.
            Command::Shutdown => {}
        }
    }

    fn open_inactive(&mut self) {
        if !self.primary_state.is_active() {
            self.open_primary();
        }
        if self.config.fallback_enabled && !self.stream_state.is_active() {
            self.open_stream();
        }
    }

    fn teardown(&mut self) {
        self.primary_retry.cancel();
        self.stream_retry.cancel();
        self.teardown_primary();
        self.teardown_stream();
    }

    // ════════════════════════════════════════════════════════════════════
    // Events
    // ════════════════════════════════════════════════════════════════════

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Primary { generation, event } => self.handle_primary(generation, event),
            SessionEvent::Stream { generation, event } => self.handle_stream(generation, event),
            SessionEvent::HeartbeatDue { generation } => self.handle_heartbeat(generation),
            SessionEvent::RetryDue(transport) => self.handle_retry(transport),
        }
    }

    fn handle_retry(&mut self, transport: TransportKind) {
        if !self.wanted || self.auth_blocked() {
            return;
        }
        match transport {
            TransportKind::Primary if !self.primary_state.is_active() => self.open_primary(),
            TransportKind::Fallback
                if self.config.fallback_enabled && !self.stream_state.is_active() =>
            {
                self.open_stream()
            }
            _ => {}
        }
    }

    fn schedule_retry(&mut self, transport: TransportKind) {
        if !self.wanted || self.auth_blocked() {
            return;
        }
        let events = self.events.clone();
        let controller = match transport {
            TransportKind::Primary => &mut self.primary_retry,
            TransportKind::Fallback => &mut self.stream_retry,
        };
        let scheduled = controller.schedule(move || {
            let _ = events.send(SessionEvent::RetryDue(transport));
        });
        if scheduled {
            tracing::debug!(
                transport = %transport,
                delay_ms = controller.delay().as_millis() as u64,
                "Reconnect scheduled"
            );
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Primary channel
    // ════════════════════════════════════════════════════════════════════

    fn open_primary(&mut self) {
        let url = match self.config.ws_url() {
            Ok(url) => url,
            Err(e) => {
                self.record_error(ConnectionError::transport(TransportKind::Primary, e.to_string()));
                return;
            }
        };

        self.primary_retry.cancel();
        self.primary_generation += 1;
        let generation = self.primary_generation;
        let events = self.events.clone();

        self.set_primary(PrimaryState::Connecting);
        self.primary = Some(PrimaryChannel::open(url, move |event| {
            let _ = events.send(SessionEvent::Primary { generation, event });
        }));
        tracing::debug!(user_id = %self.identity.user_id, generation, "Opening primary channel");
    }

    fn teardown_primary(&mut self) {
        self.heartbeat = None;
        self.primary = None;
        self.set_primary(PrimaryState::Disconnected);
    }

    fn set_primary(&mut self, next: PrimaryState) {
        if self.primary_state == next {
            return;
        }
        match self.primary_state.transition_to(next) {
            Ok(state) => self.primary_state = state,
            Err(e) => tracing::warn!(error = %e, "Ignoring primary channel transition"),
        }
    }

    fn send_primary(&self, message: ClientMessage) {
        if let Some(channel) = &self.primary {
            if !channel.send(message) {
                tracing::debug!("Primary channel task already ended");
            }
        }
    }

    fn handle_primary(&mut self, generation: u64, event: PrimaryEvent) {
        if self.primary.is_none() || generation != self.primary_generation {
            tracing::trace!(generation, "Ignoring event from stale primary channel");
            return;
        }

        match event {
            PrimaryEvent::Opened => {
                self.liveness.touch();
                self.set_primary(PrimaryState::Connected);
                self.set_primary(PrimaryState::Authenticating);
                self.send_primary(ClientMessage::Authenticate(AuthenticateMessage {
                    user_id: self.identity.user_id.clone(),
                    team_id: self.identity.team_id.clone(),
                    token: self.identity.token.expose_secret().clone(),
                }));
            }
            PrimaryEvent::Message(message) => {
                self.liveness.touch();
                self.handle_server_message(message);
            }
            PrimaryEvent::Closed { reason } => {
                self.primary_failed(ConnectionError::transport(TransportKind::Primary, reason));
            }
        }
    }

    fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Authenticated(ack) => self.on_authenticated(ack),
            ServerMessage::AuthError(rejection) => {
                self.primary_failed(ConnectionError::authentication(rejection.message));
            }
            ServerMessage::TeamJoined(joined) => {
                tracing::debug!(team_id = %joined.team_id, "Joined team room");
            }
            ServerMessage::Notification(notification) => {
                self.ingest(notification.delivered_via(TransportKind::Primary));
            }
            ServerMessage::SystemNotification(alert) => self.ingest_alert(alert),
            ServerMessage::NotificationReadAck(ack) => {
                if self.pending_acks.remove(&ack.id) {
                    self.observer.on_read_acknowledged(&ack.id);
                }
            }
            ServerMessage::Pong(_) => {}
            ServerMessage::Error(error) => {
                tracing::warn!(code = %error.code, message = %error.message, "Relay reported an error");
            }
        }
    }

    fn on_authenticated(&mut self, ack: AuthenticatedMessage) {
        if self.primary_state != PrimaryState::Authenticating {
            tracing::warn!(state = ?self.primary_state, "Unexpected authenticated message");
            return;
        }

        let lifted_hold = self.auth_blocked();
        self.set_primary(PrimaryState::Authenticated);
        self.primary_retry.cancel();
        self.last_error = None;
        self.start_heartbeat();
        if lifted_hold && self.wanted {
            // The token is good again; a stream parked by a 401 has no retry queued.
            self.open_inactive();
        }

        if let Some(team_id) = self.identity.team_id.clone() {
            self.send_primary(ClientMessage::JoinTeam(TeamMessage { team_id }));
        }
        self.flush_acks();

        tracing::info!(
            client_id = %ack.client_id,
            user_id = %ack.user_id,
            "Primary channel authenticated"
        );
    }

    fn start_heartbeat(&mut self) {
        let generation = self.primary_generation;
        let events = self.events.clone();

        self.liveness.touch();
        self.heartbeat = Some(Heartbeat::start(self.config.heartbeat_interval(), move || {
            events.send(SessionEvent::HeartbeatDue { generation }).is_ok()
        }));
    }

    fn handle_heartbeat(&mut self, generation: u64) {
        if generation != self.primary_generation || !self.primary_state.is_authenticated() {
            return;
        }
        if self.liveness.is_expired() {
            self.primary_failed(ConnectionError::transport(
                TransportKind::Primary,
                "heartbeat timed out",
            ));
            return;
        }
        self.send_primary(ClientMessage::Ping);
    }

    fn primary_failed(&mut self, error: ConnectionError) {
        let retry = !error.is_authentication();
        self.teardown_primary();
        self.record_error(error);
        if retry {
            self.schedule_retry(TransportKind::Primary);
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Fallback stream
    // ════════════════════════════════════════════════════════════════════

    fn open_stream(&mut self) {
        self.stream_retry.cancel();
        self.stream_generation += 1;
        let generation = self.stream_generation;
        let events = self.events.clone();

        let request = StreamRequest {
            url: self.config.stream_url(),
            token: Secret::new(self.identity.token.expose_secret().clone()),
            team_id: self.identity.team_id.clone(),
            liveness_timeout: self.config.stream_liveness_timeout(),
        };

        self.set_stream(StreamState::Connecting);
        self.stream = Some(FallbackStream::open(self.http.clone(), request, move |event| {
            let _ = events.send(SessionEvent::Stream { generation, event });
        }));
        tracing::debug!(user_id = %self.identity.user_id, generation, "Opening fallback stream");
    }

    fn teardown_stream(&mut self) {
        self.stream = None;
        self.set_stream(StreamState::Disconnected);
    }

    fn set_stream(&mut self, next: StreamState) {
        if self.stream_state == next {
            return;
        }
        match self.stream_state.transition_to(next) {
            Ok(state) => self.stream_state = state,
            Err(e) => tracing::warn!(error = %e, "Ignoring fallback stream transition"),
        }
    }

    fn handle_stream(&mut self, generation: u64, event: StreamEvent) {
        if self.stream.is_none() || generation != self.stream_generation {
            tracing::trace!(generation, "Ignoring event from stale fallback stream");
            return;
        }

        match event {
            StreamEvent::Opened => {
                self.set_stream(StreamState::Open);
                self.stream_retry.cancel();
                if matches!(self.last_error, Some(ConnectionError::Transport { .. })) {
                    self.last_error = None;
                }
            }
            StreamEvent::Message(message) => match message {
                StreamMessage::Connected { client_id, .. } => {
                    tracing::debug!(client_id = %client_id, "Fallback stream connected");
                }
                StreamMessage::Heartbeat { .. } => {}
                StreamMessage::Timeout => self.stream_failed(StreamFailure::ServerTimeout),
                StreamMessage::Notification { notification } => {
                    self.ingest(notification.delivered_via(TransportKind::Fallback));
                }
                StreamMessage::SystemNotification { notification } => {
                    self.ingest_alert(notification)
                }
            },
            StreamEvent::Closed(failure) => self.stream_failed(failure),
        }
    }

    fn stream_failed(&mut self, failure: StreamFailure) {
        self.teardown_stream();
        match failure {
            StreamFailure::Unauthorized(message) => {
                self.record_error(ConnectionError::authentication(message));
            }
            StreamFailure::ServerTimeout | StreamFailure::Transport(_) => {
                self.record_error(ConnectionError::transport(
                    TransportKind::Fallback,
                    failure.to_string(),
                ));
                self.schedule_retry(TransportKind::Fallback);
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Feed
    // ════════════════════════════════════════════════════════════════════

    fn ingest(&mut self, notification: Notification) {
        let id = notification.id.clone();
        let change = self.feed.apply(FeedMessage::Notification(notification));
        if change == FeedChange::Merged(MergeOutcome::Inserted) {
            if let Some(entry) = self.feed.get(&id) {
                self.observer.on_notification(entry);
            }
        }
    }

    fn ingest_alert(&mut self, alert: SystemNotification) {
        let announced = alert.clone();
        if self.feed.apply(FeedMessage::SystemNotification(alert))
            == (FeedChange::SystemAlert { added: true })
        {
            self.observer.on_system_notification(&announced);
        }
    }

    /// Remembers ids until the relay confirms them; sends now if possible.
    fn queue_acks(&mut self, ids: Vec<NotificationId>) {
        let send_now = self.primary_state.is_authenticated();
        for id in ids {
            if send_now {
                self.send_primary(ClientMessage::NotificationRead(ReadMessage { id: id.clone() }));
            }
            self.pending_acks.insert(id);
        }
    }

    fn flush_acks(&self) {
        for id in &self.pending_acks {
            self.send_primary(ClientMessage::NotificationRead(ReadMessage { id: id.clone() }));
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Status
    // ════════════════════════════════════════════════════════════════════

    fn auth_blocked(&self) -> bool {
        self.last_error
            .as_ref()
            .map_or(false, ConnectionError::is_authentication)
    }

    fn record_error(&mut self, error: ConnectionError) {
        if error.is_authentication() {
            tracing::warn!(user_id = %self.identity.user_id, error = %error, "Authentication rejected");
        } else {
            tracing::debug!(user_id = %self.identity.user_id, error = %error, "Transport failed");
        }
        self.observer.on_error(&error);
        self.last_error = Some(error);
    }

    fn publish(&mut self) {
        let status =
            ConnectionStatus::derive(self.primary_state, self.stream_state, self.last_error.as_ref());
        if status != self.last_status {
            self.observer.on_status_changed(&status);
            self.last_status = status.clone();
        }

        let snapshot = SessionSnapshot {
            status,
            primary: self.primary_state,
            stream: self.stream_state,
            notifications: self.feed.entries().to_vec(),
            alerts: self.feed.alerts().cloned().collect(),
            unread_count: self.feed.unread_count(),
            pending_acks: self.pending_acks.iter().cloned().collect(),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
