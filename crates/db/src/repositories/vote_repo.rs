//! Repository for the `votes` table.

use planpoker_core::types::DbId;
use planpoker_core::voting::RoundStatus;
use sqlx::PgPool;

use crate::models::vote::{Vote, VoteInfo};

const COLUMNS: &str = "id, round_id, user_id, score, voted_at";

pub struct VoteRepo;

impl VoteRepo {
    pub async fn find(pool: &PgPool, round_id: DbId, user_id: DbId) -> Result<Option<Vote>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM votes WHERE round_id = $1 AND user_id = $2");
        sqlx::query_as::<_, Vote>(&query)
            .bind(round_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Cast a vote while the round is active.
    ///
    /// Returns `None` if the round is not active. A second vote for the same
    /// (round, user) fails with a unique violation on `uq_votes_round_user`;
    /// the first vote is untouched.
    pub async fn insert(
        pool: &PgPool,
        round_id: DbId,
        user_id: DbId,
        score: &str,
    ) -> Result<Option<Vote>, sqlx::Error> {
        let query = format!(
            "INSERT INTO votes (round_id, user_id, score) \
             SELECT $1, $2, $3 \
             WHERE EXISTS (SELECT 1 FROM voting_rounds WHERE id = $1 AND status_id = $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Vote>(&query)
            .bind(round_id)
            .bind(user_id)
            .bind(score)
            .bind(RoundStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Votes of a round with voter names, in the order they were cast.
    pub async fn list_for_round(pool: &PgPool, round_id: DbId) -> Result<Vec<VoteInfo>, sqlx::Error> {
        sqlx::query_as::<_, VoteInfo>(
            "SELECT v.user_id, u.name, v.score, v.voted_at \
             FROM votes v \
             JOIN users u ON u.id = v.user_id \
             WHERE v.round_id = $1 \
             ORDER BY v.voted_at ASC, v.id ASC",
        )
        .bind(round_id)
        .fetch_all(pool)
        .await
    }
}
