//! Broadcast server composition.
//!
//! Wires the event bus, room registry, bridge and every router into one
//! axum `Router`. The binary adds HTTP layers and serves it; integration
//! tests serve it on an ephemeral port.

use std::sync::Arc;

use axum::Router;
use secrecy::Secret;

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::http::{producer_router, ProducerAppState};
use crate::adapters::sse::{stream_router, EventStreamState};
use crate::adapters::websocket::{websocket_router, NotificationBridge, RoomManager, WebSocketState};
use crate::application::AcknowledgeReadHandler;
use crate::config::BroadcastConfig;
use crate::ports::SessionValidator;

/// Shared pieces a running relay exposes besides its router.
#[derive(Clone)]
pub struct Relay {
    pub event_bus: Arc<InMemoryEventBus>,
    pub rooms: Arc<RoomManager>,
    pub router: Router,
}

impl Relay {
    pub fn build(
        config: &BroadcastConfig,
        validator: Arc<dyn SessionValidator>,
        producer_key: Option<Secret<String>>,
    ) -> Self {
        let event_bus = Arc::new(InMemoryEventBus::new());
        let rooms = Arc::new(RoomManager::new(config.connection_buffer));
        NotificationBridge::new_shared(rooms.clone()).register(&*event_bus);

        let acknowledge_read = Arc::new(AcknowledgeReadHandler::new(event_bus.clone()));
        let ws_state = WebSocketState::new(rooms.clone(), validator.clone(), acknowledge_read)
            .with_authenticate_timeout(config.authenticate_timeout());
        let stream_state = EventStreamState::new(rooms.clone(), validator)
            .with_timing(config.stream_heartbeat_interval(), config.stream_max_duration());
        let mut producer_state = ProducerAppState::new(event_bus.clone(), rooms.clone());
        if let Some(key) = producer_key {
            producer_state = producer_state.with_producer_key(key);
        }

        let router = Router::new()
            .merge(websocket_router(&config.ws_path).with_state(ws_state))
            .merge(stream_router(&config.stream_path).with_state(stream_state))
            .merge(producer_router().with_state(producer_state));

        tracing::debug!(
            ws_path = %config.ws_path,
            stream_path = %config.stream_path,
            "Relay routes assembled"
        );

        Self {
            event_bus,
            rooms,
            router,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::domain::notification::{NOTIFICATION_CREATED, SYSTEM_NOTIFICATION_CREATED};

    #[test]
    fn bridge_is_subscribed_to_relayed_events() {
        let relay = Relay::build(
            &BroadcastConfig::default(),
            Arc::new(MockSessionValidator::new()),
            None,
        );

        assert_eq!(relay.event_bus.handler_count(NOTIFICATION_CREATED), 1);
        assert_eq!(relay.event_bus.handler_count(SYSTEM_NOTIFICATION_CREATED), 1);
    }
}
