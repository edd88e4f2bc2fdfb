use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use planpoker_core::types::DbId;
use planpoker_db::models::user::UserSummary;
use tokio::sync::{mpsc, RwLock};

use crate::ws::registry::{ConnectionEntry, ConnectionRegistry};
use crate::ws::rooms::RoomIndex;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Result of moving a connection into a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMove {
    pub user: UserSummary,
    /// Room the connection was in before, if any. Equal to the target room
    /// when the connection re-joins the room it is already in.
    pub previous: Option<DbId>,
}

#[derive(Default)]
struct Connections {
    senders: HashMap<String, WsSender>,
    registry: ConnectionRegistry,
    rooms: RoomIndex,
}

impl Connections {
    /// Detach a connection from its room in both structures.
    fn clear_room(&mut self, conn_id: &str) -> Option<DbId> {
        let previous = self.registry.set_room(conn_id, None).flatten();
        if let Some(session_id) = previous {
            self.rooms.remove(session_id, conn_id);
        }
        previous
    }
}

/// Manages all active WebSocket connections and their room membership.
///
/// The connection registry and the room index live behind one lock so every
/// join, leave and disconnect updates both together. Designed to be wrapped
/// in `Arc` and shared across the application.
pub struct WsManager {
    inner: RwLock<Connections>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Connections::default()),
        }
    }

    /// Register an authenticated connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, user: UserSummary) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        inner.clear_room(&conn_id);
        inner.senders.insert(conn_id.clone(), tx);
        inner.registry.register(conn_id, user);
        rx
    }

    /// Tear down a connection entirely, returning its last registry entry.
    ///
    /// Removing an unknown connection is a no-op.
    pub async fn remove(&self, conn_id: &str) -> Option<ConnectionEntry> {
        let mut inner = self.inner.write().await;
        inner.clear_room(conn_id);
        inner.senders.remove(conn_id);
        inner.registry.remove(conn_id)
    }

    pub async fn get(&self, conn_id: &str) -> Option<ConnectionEntry> {
        self.inner.read().await.registry.get(conn_id).cloned()
    }

    /// Move a connection into `session_id`, leaving its current room first.
    ///
    /// Returns `None` if the connection is no longer registered.
    pub async fn join_room(&self, conn_id: &str, session_id: DbId) -> Option<RoomMove> {
        let mut inner = self.inner.write().await;
        let user = inner.registry.get(conn_id)?.user.clone();
        let previous = inner.clear_room(conn_id);
        inner.registry.set_room(conn_id, Some(session_id));
        inner.rooms.add(session_id, conn_id);
        Some(RoomMove { user, previous })
    }

    /// Take a connection out of `session_id`.
    ///
    /// Returns the user only if the connection was actually in that room;
    /// stale or duplicate leaves return `None`.
    pub async fn leave_room(&self, conn_id: &str, session_id: DbId) -> Option<UserSummary> {
        let mut inner = self.inner.write().await;
        let entry = inner.registry.get(conn_id)?;
        if entry.session_id != Some(session_id) {
            return None;
        }
        let user = entry.user.clone();
        inner.clear_room(conn_id);
        Some(user)
    }

    /// Connection ids currently in the room.
    pub async fn members(&self, session_id: DbId) -> Vec<String> {
        self.inner.read().await.rooms.members(session_id)
    }

    /// Queue a message for one connection. Returns `false` if the connection
    /// is unknown or its channel is closed.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        self.inner
            .read()
            .await
            .senders
            .get(conn_id)
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Queue a message for every member of a room, optionally skipping one
    /// connection. Returns the number of connections it was queued for.
    ///
    /// Closed channels are skipped silently; they are cleaned up when their
    /// receive loop exits. Takes the write lock so every member observes
    /// concurrent fan-outs in the same order.
    pub async fn broadcast_room(
        &self,
        session_id: DbId,
        message: Message,
        exclude: Option<&str>,
    ) -> usize {
        let inner = self.inner.write().await;
        let mut count = 0;
        for conn_id in inner.rooms.members(session_id) {
            if exclude == Some(conn_id.as_str()) {
                continue;
            }
            if let Some(tx) = inner.senders.get(&conn_id) {
                if tx.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.senders.len()
    }

    /// Number of rooms with at least one live connection.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.room_count()
    }

    /// Whether the room index and the registry agree on every room.
    pub async fn is_consistent(&self) -> bool {
        let inner = self.inner.read().await;
        let mut rooms: Vec<DbId> = inner.rooms.rooms().collect();
        rooms.extend(
            inner
                .senders
                .keys()
                .filter_map(|id| inner.registry.get(id).and_then(|e| e.session_id)),
        );
        rooms.into_iter().all(|session_id| {
            let mut from_registry: Vec<&str> = inner.registry.in_room(session_id).collect();
            from_registry.sort_unstable();
            inner.rooms.members(session_id) == from_registry
        })
    }

    /// Send a Close frame to every connection, then clear all state.
    ///
    /// Used during graceful shutdown to notify all clients.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.senders.len();
        for tx in inner.senders.values() {
            let _ = tx.send(Message::Close(None));
        }
        inner.senders.clear();
        inner.registry.clear();
        inner.rooms.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for tx in inner.senders.values() {
            let _ = tx.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
