//! Topic model and DTOs.

use planpoker_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `topics` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Topic {
    pub id: DbId,
    pub session_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<DbId>,
    pub order_index: i32,
    pub created_at: Timestamp,
}

/// DTO for creating a topic inside a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopic {
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub order_index: i32,
}
