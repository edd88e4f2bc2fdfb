//! Voting round model.

use planpoker_core::types::{DbId, StatusId, Timestamp};
use planpoker_core::voting::RoundStatus;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `voting_rounds` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct VotingRound {
    pub id: DbId,
    pub session_id: DbId,
    pub topic_id: DbId,
    pub round_number: i32,
    pub status_id: StatusId,
    pub final_score: Option<String>,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
}

impl VotingRound {
    pub fn status(&self) -> RoundStatus {
        RoundStatus::from_id(self.status_id).unwrap_or(RoundStatus::Completed)
    }

    pub fn is_active(&self) -> bool {
        self.status() == RoundStatus::Active
    }
}
