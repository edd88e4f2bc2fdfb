//! Room membership index: planning session -> live connection ids.

use std::collections::{BTreeSet, HashMap};

use planpoker_core::types::DbId;

/// Rooms with at least one member. A room whose last member leaves is
/// dropped, never kept as an empty set.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<DbId, BTreeSet<String>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the connection was not already a member.
    pub fn add(&mut self, session_id: DbId, conn_id: &str) -> bool {
        self.rooms
            .entry(session_id)
            .or_default()
            .insert(conn_id.to_string())
    }

    /// Returns `true` if the connection was a member.
    pub fn remove(&mut self, session_id: DbId, conn_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(&session_id) else {
            return false;
        };
        let removed = members.remove(conn_id);
        if members.is_empty() {
            self.rooms.remove(&session_id);
        }
        removed
    }

    /// Members of the room, in a stable order. Empty for unknown rooms.
    pub fn members(&self, session_id: DbId) -> Vec<String> {
        self.rooms
            .get(&session_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = DbId> + '_ {
        self.rooms.keys().copied()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}
