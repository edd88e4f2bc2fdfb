//! Repository for the `chat_messages` table.

use planpoker_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat_message::ChatMessage;

const COLUMNS: &str = "id, session_id, user_id, message, message_type, created_at";

pub struct ChatMessageRepo;

impl ChatMessageRepo {
    pub async fn create(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        message: &str,
        message_type: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages (session_id, user_id, message, message_type) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(session_id)
            .bind(user_id)
            .bind(message)
            .bind(message_type)
            .fetch_one(pool)
            .await
    }

    /// Messages of a session, oldest first.
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages WHERE session_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
