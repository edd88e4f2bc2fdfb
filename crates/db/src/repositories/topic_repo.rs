//! Repository for the `topics` table.

use planpoker_core::types::DbId;
use sqlx::PgPool;

use crate::models::topic::{CreateTopic, Topic};

const COLUMNS: &str = "id, session_id, title, description, parent_id, order_index, created_at";

pub struct TopicRepo;

impl TopicRepo {
    /// Insert a topic as part of a larger write, such as session creation.
    pub async fn create_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session_id: DbId,
        input: &CreateTopic,
    ) -> Result<Topic, sqlx::Error> {
        let query = format!(
            "INSERT INTO topics (session_id, title, description, parent_id, order_index) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Topic>(&query)
            .bind(session_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.parent_id)
            .bind(input.order_index)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Topic>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM topics WHERE id = $1");
        sqlx::query_as::<_, Topic>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Topics of a session in presentation order.
    pub async fn list_for_session(pool: &PgPool, session_id: DbId) -> Result<Vec<Topic>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM topics WHERE session_id = $1 \
             ORDER BY order_index ASC, created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Topic>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
