//! Chat message model.

use planpoker_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `chat_messages` table. Append-only.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub message: String,
    /// `"text"` or `"emoticon"`.
    pub message_type: String,
    pub created_at: Timestamp,
}
