//! Repository for the `planning_sessions` table.

use planpoker_core::planning::SessionStatus;
use planpoker_core::types::DbId;
use sqlx::PgPool;

use crate::models::planning_session::{CreatePlanningSession, PlanningSession};
use crate::models::topic::CreateTopic;
use crate::repositories::{ParticipantRepo, TopicRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, project_id, created_by, room_code, metrics, status_id, \
                       allow_chat, allow_emoticons, notify_email, scheduled_at, \
                       started_at, ended_at, created_at, updated_at";

/// Provides CRUD operations and lifecycle transitions for planning sessions.
pub struct PlanningSessionRepo;

impl PlanningSessionRepo {
    /// Insert a new session, returning the created row.
    ///
    /// A room code collision surfaces as a unique violation on
    /// `uq_planning_sessions_room_code`.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePlanningSession,
    ) -> Result<PlanningSession, sqlx::Error> {
        Self::create_with_members(pool, input, &[], &[]).await
    }

    /// Insert a session together with its initial topics and participants.
    ///
    /// Runs in one transaction: either the session exists with every topic
    /// and participant, or nothing was written. Topics keep the given order;
    /// repeated participant ids are added once.
    pub async fn create_with_members(
        pool: &PgPool,
        input: &CreatePlanningSession,
        topics: &[CreateTopic],
        participant_ids: &[DbId],
    ) -> Result<PlanningSession, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO planning_sessions \
                 (title, project_id, created_by, room_code, metrics, status_id, \
                  allow_chat, allow_emoticons, notify_email, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, PlanningSession>(&query)
            .bind(&input.title)
            .bind(input.project_id)
            .bind(input.created_by)
            .bind(&input.room_code)
            .bind(&input.metrics)
            .bind(input.status_id)
            .bind(input.allow_chat)
            .bind(input.allow_emoticons)
            .bind(input.notify_email)
            .bind(input.scheduled_at)
            .fetch_one(&mut *tx)
            .await?;

        for topic in topics {
            TopicRepo::create_in_tx(&mut tx, session.id, topic).await?;
        }
        for user_id in participant_ids {
            ParticipantRepo::add_in_tx(&mut tx, session.id, *user_id).await?;
        }

        tx.commit().await?;
        Ok(session)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PlanningSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM planning_sessions WHERE id = $1");
        sqlx::query_as::<_, PlanningSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by its (already normalised) room code.
    pub async fn find_by_room_code(
        pool: &PgPool,
        room_code: &str,
    ) -> Result<Option<PlanningSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM planning_sessions WHERE room_code = $1");
        sqlx::query_as::<_, PlanningSession>(&query)
            .bind(room_code)
            .fetch_optional(pool)
            .await
    }

    pub async fn room_code_exists(pool: &PgPool, room_code: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM planning_sessions WHERE room_code = $1)")
                .bind(room_code)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Move a session to `next`, stamping `started_at` / `ended_at`.
    ///
    /// The update only applies while the session is still in one of `from`,
    /// so two concurrent transitions cannot both succeed. Returns `None` if
    /// the session does not exist or was not in an allowed state.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: &[SessionStatus],
        next: SessionStatus,
    ) -> Result<Option<PlanningSession>, sqlx::Error> {
        let from_ids: Vec<i16> = from.iter().map(|s| s.id()).collect();
        let query = format!(
            "UPDATE planning_sessions SET \
                 status_id = $2, \
                 started_at = CASE WHEN $2 = {active} THEN NOW() ELSE started_at END, \
                 ended_at = CASE WHEN $2 = {completed} THEN NOW() ELSE ended_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($3) \
             RETURNING {COLUMNS}",
            active = SessionStatus::Active.id(),
            completed = SessionStatus::Completed.id(),
        );
        sqlx::query_as::<_, PlanningSession>(&query)
            .bind(id)
            .bind(next.id())
            .bind(&from_ids)
            .fetch_optional(pool)
            .await
    }
}
