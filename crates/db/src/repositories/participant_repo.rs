//! Repository for the `planning_participants` table.

use planpoker_core::types::DbId;
use sqlx::PgPool;

use crate::models::participant::ParticipantInfo;

const INSERT_PARTICIPANT: &str =
    "INSERT INTO planning_participants (session_id, user_id) VALUES ($1, $2) \
     ON CONFLICT (session_id, user_id) DO NOTHING";

/// Participant membership facts, unique per (session, user).
pub struct ParticipantRepo;

impl ParticipantRepo {
    pub async fn exists(pool: &PgPool, session_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM planning_participants WHERE session_id = $1 AND user_id = $2 \
             )",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Add a participant. Adding an existing participant is a no-op.
    ///
    /// Returns `true` if a row was inserted.
    pub async fn add(pool: &PgPool, session_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(INSERT_PARTICIPANT)
            .bind(session_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// [`ParticipantRepo::add`] inside an open transaction.
    pub async fn add_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(INSERT_PARTICIPANT)
            .bind(session_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List participants with their public details, in join order.
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ParticipantInfo>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantInfo>(
            "SELECT pp.user_id, u.name, u.email, pp.joined_at \
             FROM planning_participants pp \
             JOIN users u ON u.id = pp.user_id \
             WHERE pp.session_id = $1 \
             ORDER BY pp.joined_at ASC, pp.id ASC",
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_session(pool: &PgPool, session_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM planning_participants WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
