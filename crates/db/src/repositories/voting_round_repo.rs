//! Repository for the `voting_rounds` table.

use planpoker_core::types::DbId;
use planpoker_core::voting::RoundStatus;
use sqlx::PgPool;

use crate::models::voting_round::VotingRound;

const COLUMNS: &str = "id, session_id, topic_id, round_number, status_id, final_score, \
                       started_at, ended_at";

/// Round allocation and completion.
pub struct VotingRoundRepo;

impl VotingRoundRepo {
    /// Open the next round for a topic.
    ///
    /// The round number is computed inside the INSERT. Two concurrent calls
    /// for the same topic collide on `uq_voting_rounds_topic_round` or
    /// `uq_voting_rounds_topic_active`; the loser gets a unique violation.
    pub async fn create_next(
        pool: &PgPool,
        session_id: DbId,
        topic_id: DbId,
    ) -> Result<VotingRound, sqlx::Error> {
        let query = format!(
            "INSERT INTO voting_rounds (session_id, topic_id, round_number, status_id) \
             SELECT $1, $2, COALESCE(MAX(round_number), 0) + 1, $3 \
             FROM voting_rounds WHERE topic_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VotingRound>(&query)
            .bind(session_id)
            .bind(topic_id)
            .bind(RoundStatus::Active.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VotingRound>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM voting_rounds WHERE id = $1");
        sqlx::query_as::<_, VotingRound>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_active_for_topic(
        pool: &PgPool,
        topic_id: DbId,
    ) -> Result<Option<VotingRound>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM voting_rounds WHERE topic_id = $1 AND status_id = $2"
        );
        sqlx::query_as::<_, VotingRound>(&query)
            .bind(topic_id)
            .bind(RoundStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// The most recently started active round of a session, if any.
    pub async fn find_active_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<VotingRound>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM voting_rounds WHERE session_id = $1 AND status_id = $2 \
             ORDER BY started_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, VotingRound>(&query)
            .bind(session_id)
            .bind(RoundStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Close an active round, recording the final score.
    ///
    /// Returns `None` if the round does not exist or is already completed.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        final_score: Option<&str>,
    ) -> Result<Option<VotingRound>, sqlx::Error> {
        let query = format!(
            "UPDATE voting_rounds SET status_id = $3, final_score = $2, ended_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VotingRound>(&query)
            .bind(id)
            .bind(final_score)
            .bind(RoundStatus::Completed.id())
            .bind(RoundStatus::Active.id())
            .fetch_optional(pool)
            .await
    }
}
