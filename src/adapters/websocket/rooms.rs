//! Room registry shared by both transports.
//!
//! Every connection sits in its user's private room and in any team rooms it
//! joined. A notification for user U and team T reaches the union of both
//! rooms, each connection at most once.
//!
//! # Architecture
//!
//! ```text
//! Room: user:u1        Room: team:t9
//! ├── client-a (ws)    ├── client-a (ws)
//! └── client-b (sse)   └── client-c (ws, user u2)
//! ```
//!
//! A notification for (u1, t9) is enqueued once each for a, b and c.
//!
//! # Concurrency
//!
//! One `RwLock` guards both maps. Broadcasts hold the read lock while
//! enqueueing with `try_send`, so they never wait on a client. Joins and
//! leaves take the write lock, so a departing member either receives an
//! in-flight broadcast or none sent after its departure.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{ClientId, TeamId, UserId};
use crate::domain::notification::{Notification, SystemNotification, TransportKind};

/// Default per-connection outbound buffer.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// A broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    User(UserId),
    Team(TeamId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{}", id),
            Room::Team(id) => write!(f, "team:{}", id),
        }
    }
}

/// Transport-neutral payload enqueued to each recipient.
///
/// Each connection's writer renders it in its own wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Notification(Notification),
    SystemNotification(SystemNotification),
}

struct ClientEntry {
    user_id: UserId,
    transport: TransportKind,
    rooms: HashSet<Room>,
    sender: mpsc::Sender<Delivery>,
}

#[derive(Default)]
struct Registry {
    rooms: HashMap<Room, HashSet<ClientId>>,
    clients: HashMap<ClientId, ClientEntry>,
}

impl Registry {
    fn add_to_room(&mut self, room: Room, client_id: ClientId) {
        self.rooms.entry(room).or_default().insert(client_id);
    }

    fn remove_from_room(&mut self, room: &Room, client_id: &ClientId) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(client_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    fn enqueue(&self, client_id: &ClientId, delivery: Delivery) -> bool {
        let Some(entry) = self.clients.get(client_id) else {
            return false;
        };
        match entry.sender.try_send(delivery) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    client_id = %client_id,
                    user_id = %entry.user_id,
                    transport = %entry.transport,
                    "Outbound buffer full, dropping delivery"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %client_id, "Connection closing, delivery skipped");
                false
            }
        }
    }
}

/// Tracks live connections and the rooms they belong to.
pub struct RoomManager {
    registry: RwLock<Registry>,
    connection_buffer: usize,
}

impl RoomManager {
    /// Creates a manager whose connections buffer up to `connection_buffer`
    /// deliveries before dropping.
    pub fn new(connection_buffer: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            connection_buffer: connection_buffer.max(1),
        }
    }

    /// Registers an authenticated connection in its user room.
    ///
    /// Returns the receiver the connection's writer drains. Registering an
    /// existing id replaces the previous registration.
    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: UserId,
        transport: TransportKind,
    ) -> mpsc::Receiver<Delivery> {
        let (tx, rx) = mpsc::channel(self.connection_buffer);
        let room = Room::User(user_id.clone());

        let mut registry = self.registry.write().await;
        if let Some(previous) = registry.clients.remove(&client_id) {
            for room in &previous.rooms {
                registry.remove_from_room(room, &client_id);
            }
        }
        registry.add_to_room(room.clone(), client_id);
        registry.clients.insert(
            client_id,
            ClientEntry {
                user_id: user_id.clone(),
                transport,
                rooms: HashSet::from([room]),
                sender: tx,
            },
        );

        tracing::debug!(client_id = %client_id, user_id = %user_id, transport = %transport, "Client registered");
        rx
    }

    /// Adds a registered connection to a team room. Returns false for unknown clients.
    pub async fn join_team(&self, client_id: &ClientId, team_id: TeamId) -> bool {
        let room = Room::Team(team_id);
        let mut registry = self.registry.write().await;
        match registry.clients.get_mut(client_id) {
            Some(entry) => {
                entry.rooms.insert(room.clone());
            }
            None => return false,
        }
        tracing::debug!(client_id = %client_id, room = %room, "Joined room");
        registry.add_to_room(room, *client_id);
        true
    }

    /// Removes a connection from a team room.
    pub async fn leave_team(&self, client_id: &ClientId, team_id: &TeamId) {
        let room = Room::Team(team_id.clone());
        let mut registry = self.registry.write().await;
        if let Some(entry) = registry.clients.get_mut(client_id) {
            entry.rooms.remove(&room);
        }
        registry.remove_from_room(&room, client_id);
    }

    /// Removes a connection from every room and drops its sender.
    ///
    /// Empty rooms are cleaned up. Unknown ids are ignored.
    pub async fn leave(&self, client_id: &ClientId) {
        let mut registry = self.registry.write().await;
        if let Some(entry) = registry.clients.remove(client_id) {
            for room in &entry.rooms {
                registry.remove_from_room(room, client_id);
            }
            tracing::debug!(client_id = %client_id, user_id = %entry.user_id, "Client left");
        }
    }

    /// Delivers to every connection in any of `rooms`, each connection once.
    ///
    /// Returns the number of connections the delivery was enqueued for.
    pub async fn broadcast(&self, rooms: &[Room], delivery: Delivery) -> usize {
        let registry = self.registry.read().await;

        let recipients: HashSet<&ClientId> = rooms
            .iter()
            .filter_map(|room| registry.rooms.get(room))
            .flatten()
            .collect();

        recipients
            .into_iter()
            .filter(|client_id| registry.enqueue(client_id, delivery.clone()))
            .count()
    }

    /// Delivers to every live connection.
    pub async fn broadcast_all(&self, delivery: Delivery) -> usize {
        let registry = self.registry.read().await;
        registry
            .clients
            .keys()
            .filter(|client_id| registry.enqueue(client_id, delivery.clone()))
            .count()
    }

    /// Number of connections in a room (0 if the room doesn't exist).
    pub async fn client_count(&self, room: &Room) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }

    pub async fn total_client_count(&self) -> usize {
        self.registry.read().await.clients.len()
    }

    pub async fn room_count(&self) -> usize {
        self.registry.read().await.rooms.len()
    }

    /// All non-empty rooms (for monitoring).
    pub async fn active_rooms(&self) -> Vec<Room> {
        self.registry.read().await.rooms.keys().cloned().collect()
    }

    /// Rooms a connection belongs to.
    pub async fn rooms_of(&self, client_id: &ClientId) -> Vec<Room> {
        self.registry
            .read()
            .await
            .clients
            .get(client_id)
            .map(|entry| entry.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{NotificationId, Timestamp};
    use crate::domain::notification::{NotificationType, SystemLevel};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn team(id: &str) -> TeamId {
        TeamId::new(id).unwrap()
    }

    fn delivery(id: &str) -> Delivery {
        Delivery::Notification(Notification::new(
            NotificationId::new(id).unwrap(),
            user("u1"),
            NotificationType::ApprovalRequired,
            "Approval needed",
            "Review the draft",
        )
        .occurred_at(Timestamp::from_unix_secs(1_700_000_000)))
    }

    #[tokio::test]
    async fn register_joins_user_room() {
        let manager = RoomManager::default();
        let client = ClientId::new();

        let _rx = manager.register(client, user("u1"), TransportKind::Primary).await;

        assert_eq!(manager.client_count(&Room::User(user("u1"))).await, 1);
        assert_eq!(manager.rooms_of(&client).await, vec![Room::User(user("u1"))]);
    }

    #[tokio::test]
    async fn user_and_team_broadcast_reaches_union_once() {
        let manager = RoomManager::default();
        let a = ClientId::new();
        let b = ClientId::new();
        let c = ClientId::new();
        let outsider = ClientId::new();

        let mut rx_a = manager.register(a, user("u1"), TransportKind::Primary).await;
        let mut rx_b = manager.register(b, user("u1"), TransportKind::Fallback).await;
        let mut rx_c = manager.register(c, user("u2"), TransportKind::Primary).await;
        let mut rx_out = manager.register(outsider, user("u3"), TransportKind::Primary).await;
        manager.join_team(&a, team("t9")).await;
        manager.join_team(&c, team("t9")).await;

        let sent = manager
            .broadcast(&[Room::User(user("u1")), Room::Team(team("t9"))], delivery("n1"))
            .await;

        assert_eq!(sent, 3);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err(), "client in both rooms gets one copy");
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());
        assert!(rx_out.try_recv().is_err());
    }

    #[tokio::test]
    async fn member_leaving_team_misses_later_broadcasts() {
        let manager = RoomManager::default();
        let client = ClientId::new();
        let mut rx = manager.register(client, user("u2"), TransportKind::Primary).await;
        manager.join_team(&client, team("t1")).await;

        manager.broadcast(&[Room::Team(team("t1"))], delivery("before")).await;
        manager.leave_team(&client, &team("t1")).await;
        manager.broadcast(&[Room::Team(team("t1"))], delivery("after")).await;

        assert_eq!(rx.try_recv().unwrap(), delivery("before"));
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.client_count(&Room::Team(team("t1"))).await, 0);
    }

    #[tokio::test]
    async fn full_buffer_drops_only_for_slow_client() {
        let manager = RoomManager::new(1);
        let slow = ClientId::new();
        let fast = ClientId::new();
        let mut rx_slow = manager.register(slow, user("u1"), TransportKind::Primary).await;
        let mut rx_fast = manager.register(fast, user("u1"), TransportKind::Fallback).await;

        manager.broadcast(&[Room::User(user("u1"))], delivery("n1")).await;
        rx_fast.recv().await.unwrap();
        let sent = manager.broadcast(&[Room::User(user("u1"))], delivery("n2")).await;

        assert_eq!(sent, 1);
        assert_eq!(rx_fast.recv().await.unwrap(), delivery("n2"));
        assert_eq!(rx_slow.recv().await.unwrap(), delivery("n1"));
        assert!(rx_slow.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_cleans_up_rooms_and_closes_receiver() {
        let manager = RoomManager::default();
        let client = ClientId::new();
        let mut rx = manager.register(client, user("u1"), TransportKind::Primary).await;
        manager.join_team(&client, team("t1")).await;
        assert_eq!(manager.room_count().await, 2);

        manager.leave(&client).await;

        assert_eq!(manager.room_count().await, 0);
        assert_eq!(manager.total_client_count().await, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn join_team_requires_registration() {
        let manager = RoomManager::default();
        assert!(!manager.join_team(&ClientId::new(), team("t1")).await);
        assert!(manager.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_all_reaches_every_connection() {
        let manager = RoomManager::default();
        let mut rx1 = manager.register(ClientId::new(), user("u1"), TransportKind::Primary).await;
        let mut rx2 = manager.register(ClientId::new(), user("u2"), TransportKind::Fallback).await;

        let alert = Delivery::SystemNotification(SystemNotification::new(
            "Maintenance",
            "Tonight",
            SystemLevel::Warning,
        ));
        assert_eq!(manager.broadcast_all(alert).await, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_noop() {
        let manager = RoomManager::default();
        assert_eq!(manager.broadcast(&[Room::Team(team("ghost"))], delivery("n1")).await, 0);
    }

    #[test]
    fn room_display_is_prefixed() {
        assert_eq!(Room::User(user("u1")).to_string(), "user:u1");
        assert_eq!(Room::Team(team("t1")).to_string(), "team:t1");
    }
}
