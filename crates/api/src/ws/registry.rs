//! Connection registry: live connection id -> authenticated user and room.

use std::collections::HashMap;

use planpoker_core::types::{DbId, Timestamp};
use planpoker_db::models::user::UserSummary;

/// Registry entry for one live connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEntry {
    pub user: UserSummary,
    /// Planning session the connection is currently in, if any.
    pub session_id: Option<DbId>,
    pub connected_at: Timestamp,
}

/// Plain key-value store of live connections. No I/O and no locking; the
/// owner guards it together with the [`RoomIndex`](super::rooms::RoomIndex).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<String, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with no room. Replaces any previous entry.
    pub fn register(&mut self, conn_id: String, user: UserSummary) {
        self.entries.insert(
            conn_id,
            ConnectionEntry {
                user,
                session_id: None,
                connected_at: chrono::Utc::now(),
            },
        );
    }

    /// Set (or clear) the connection's current room, returning the previous
    /// one. Returns `None` if the connection is not registered.
    pub fn set_room(&mut self, conn_id: &str, session_id: Option<DbId>) -> Option<Option<DbId>> {
        self.entries
            .get_mut(conn_id)
            .map(|entry| std::mem::replace(&mut entry.session_id, session_id))
    }

    pub fn get(&self, conn_id: &str) -> Option<&ConnectionEntry> {
        self.entries.get(conn_id)
    }

    pub fn remove(&mut self, conn_id: &str) -> Option<ConnectionEntry> {
        self.entries.remove(conn_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connection ids whose current room is `session_id`.
    pub fn in_room(&self, session_id: DbId) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.session_id == Some(session_id))
            .map(|(id, _)| id.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
