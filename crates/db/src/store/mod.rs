//! The narrow persistence interface consumed by the real-time coordinator.
//!
//! [`SessionStore`] is implemented by [`postgres::PgSessionStore`] for
//! production and by [`memory::MemorySessionStore`] for tests. Both enforce
//! the same uniqueness rules and report violations with the same constraint
//! names, so callers can classify conflicts without knowing the backend.

use async_trait::async_trait;
use planpoker_core::types::DbId;

use crate::models::chat_message::ChatMessage;
use crate::models::participant::ParticipantInfo;
use crate::models::planning_session::PlanningSession;
use crate::models::topic::Topic;
use crate::models::user::User;
use crate::models::vote::{Vote, VoteInfo};
use crate::models::voting_round::VotingRound;

pub mod memory;
pub mod postgres;

/// Unique constraint names shared by the schema and the in-memory store.
pub mod constraints {
    pub const ROOM_CODE: &str = "uq_planning_sessions_room_code";
    pub const PARTICIPANT: &str = "uq_planning_participants_session_user";
    pub const ROUND_NUMBER: &str = "uq_voting_rounds_topic_round";
    pub const ACTIVE_ROUND: &str = "uq_voting_rounds_topic_active";
    pub const VOTE: &str = "uq_votes_round_user";
}

/// PostgreSQL SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether this is a conflict on the named constraint.
    pub fn is_conflict_on(&self, name: &str) -> bool {
        matches!(self, Self::Conflict { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                if let Some(constraint) = db_err.constraint() {
                    tracing::debug!(constraint, "Unique constraint rejected write");
                    return Self::Conflict {
                        constraint: constraint.to_string(),
                    };
                }
            }
        }
        Self::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record store for sessions, participants, topics, rounds, votes and chat.
///
/// Every read is consistent with every write that completed before it; the
/// coordinator relies on that to recompute snapshots after each mutation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_user_by_id(&self, user_id: DbId) -> StoreResult<Option<User>>;

    async fn get_session_by_id(&self, session_id: DbId) -> StoreResult<Option<PlanningSession>>;

    /// Look up a session by an already normalised room code.
    async fn get_session_by_room_code(
        &self,
        room_code: &str,
    ) -> StoreResult<Option<PlanningSession>>;

    async fn is_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool>;

    /// Idempotent. Returns `true` only when a new participant row was created.
    async fn add_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool>;

    /// Participants in join order.
    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<ParticipantInfo>>;

    async fn count_participants(&self, session_id: DbId) -> StoreResult<i64>;

    /// Topics ordered by `order_index`, then creation.
    async fn list_topics(&self, session_id: DbId) -> StoreResult<Vec<Topic>>;

    async fn get_topic(&self, topic_id: DbId) -> StoreResult<Option<Topic>>;

    async fn get_active_round_for_topic(&self, topic_id: DbId) -> StoreResult<Option<VotingRound>>;

    /// The most recently started active round in the session.
    async fn get_active_round_for_session(
        &self,
        session_id: DbId,
    ) -> StoreResult<Option<VotingRound>>;

    /// Open round `max + 1` for the topic in a single conditional write.
    ///
    /// Fails with a conflict on [`constraints::ACTIVE_ROUND`] or
    /// [`constraints::ROUND_NUMBER`] if another round is active or was
    /// allocated concurrently.
    async fn create_round(&self, session_id: DbId, topic_id: DbId) -> StoreResult<VotingRound>;

    async fn get_round(&self, round_id: DbId) -> StoreResult<Option<VotingRound>>;

    async fn get_vote(&self, round_id: DbId, user_id: DbId) -> StoreResult<Option<Vote>>;

    /// Insert a vote if the round is still active; `None` otherwise.
    ///
    /// A second vote for the same (round, user) fails with a conflict on
    /// [`constraints::VOTE`] and leaves the first one untouched.
    async fn insert_vote(
        &self,
        round_id: DbId,
        user_id: DbId,
        score: &str,
    ) -> StoreResult<Option<Vote>>;

    /// Votes of the round with voter names, in the order they were cast.
    async fn list_votes_for_round(&self, round_id: DbId) -> StoreResult<Vec<VoteInfo>>;

    /// Move an active round to completed. Returns `None` if the round does
    /// not exist or was no longer active.
    async fn complete_round(
        &self,
        round_id: DbId,
        final_score: Option<&str>,
    ) -> StoreResult<Option<VotingRound>>;

    async fn insert_chat_message(
        &self,
        session_id: DbId,
        user_id: DbId,
        message: &str,
        message_type: &str,
    ) -> StoreResult<ChatMessage>;

    /// Whether the user holds one of `roles` on the session's project.
    async fn has_project_role(
        &self,
        session_id: DbId,
        user_id: DbId,
        roles: &[&str],
    ) -> StoreResult<bool>;
}
