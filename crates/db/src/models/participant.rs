//! Session participant models.

use planpoker_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `planning_participants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub joined_at: Timestamp,
}

/// Participant joined with the user's public details.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ParticipantInfo {
    pub user_id: DbId,
    pub name: String,
    pub email: String,
    pub joined_at: Timestamp,
}
