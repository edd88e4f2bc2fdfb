//! Vote models.

use planpoker_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `votes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Vote {
    pub id: DbId,
    pub round_id: DbId,
    pub user_id: DbId,
    pub score: String,
    pub voted_at: Timestamp,
}

/// Vote joined with the voter's display name.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct VoteInfo {
    pub user_id: DbId,
    pub name: String,
    pub score: String,
    pub voted_at: Timestamp,
}
