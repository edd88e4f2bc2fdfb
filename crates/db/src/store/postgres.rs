//! [`SessionStore`] backed by PostgreSQL through the repository layer.

use async_trait::async_trait;
use planpoker_core::types::DbId;

use crate::models::chat_message::ChatMessage;
use crate::models::participant::ParticipantInfo;
use crate::models::planning_session::PlanningSession;
use crate::models::topic::Topic;
use crate::models::user::User;
use crate::models::vote::{Vote, VoteInfo};
use crate::models::voting_round::VotingRound;
use crate::repositories::{
    ChatMessageRepo, ParticipantRepo, PlanningSessionRepo, ProjectMemberRepo, TopicRepo,
    UserRepo, VoteRepo, VotingRoundRepo,
};
use crate::store::{SessionStore, StoreResult};
use crate::DbPool;

#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get_user_by_id(&self, user_id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&self.pool, user_id).await?)
    }

    async fn get_session_by_id(&self, session_id: DbId) -> StoreResult<Option<PlanningSession>> {
        Ok(PlanningSessionRepo::find_by_id(&self.pool, session_id).await?)
    }

    async fn get_session_by_room_code(
        &self,
        room_code: &str,
    ) -> StoreResult<Option<PlanningSession>> {
        Ok(PlanningSessionRepo::find_by_room_code(&self.pool, room_code).await?)
    }

    async fn is_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(ParticipantRepo::exists(&self.pool, session_id, user_id).await?)
    }

    async fn add_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(ParticipantRepo::add(&self.pool, session_id, user_id).await?)
    }

    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<ParticipantInfo>> {
        Ok(ParticipantRepo::list_for_session(&self.pool, session_id).await?)
    }

    async fn count_participants(&self, session_id: DbId) -> StoreResult<i64> {
        Ok(ParticipantRepo::count_for_session(&self.pool, session_id).await?)
    }

    async fn list_topics(&self, session_id: DbId) -> StoreResult<Vec<Topic>> {
        Ok(TopicRepo::list_for_session(&self.pool, session_id).await?)
    }

    async fn get_topic(&self, topic_id: DbId) -> StoreResult<Option<Topic>> {
        Ok(TopicRepo::find_by_id(&self.pool, topic_id).await?)
    }

    async fn get_active_round_for_topic(&self, topic_id: DbId) -> StoreResult<Option<VotingRound>> {
        Ok(VotingRoundRepo::find_active_for_topic(&self.pool, topic_id).await?)
    }

    async fn get_active_round_for_session(
        &self,
        session_id: DbId,
    ) -> StoreResult<Option<VotingRound>> {
        Ok(VotingRoundRepo::find_active_for_session(&self.pool, session_id).await?)
    }

    async fn create_round(&self, session_id: DbId, topic_id: DbId) -> StoreResult<VotingRound> {
        Ok(VotingRoundRepo::create_next(&self.pool, session_id, topic_id).await?)
    }

    async fn get_round(&self, round_id: DbId) -> StoreResult<Option<VotingRound>> {
        Ok(VotingRoundRepo::find_by_id(&self.pool, round_id).await?)
    }

    async fn get_vote(&self, round_id: DbId, user_id: DbId) -> StoreResult<Option<Vote>> {
        Ok(VoteRepo::find(&self.pool, round_id, user_id).await?)
    }

    async fn insert_vote(
        &self,
        round_id: DbId,
        user_id: DbId,
        score: &str,
    ) -> StoreResult<Option<Vote>> {
        Ok(VoteRepo::insert(&self.pool, round_id, user_id, score).await?)
    }

    async fn list_votes_for_round(&self, round_id: DbId) -> StoreResult<Vec<VoteInfo>> {
        Ok(VoteRepo::list_for_round(&self.pool, round_id).await?)
    }

    async fn complete_round(
        &self,
        round_id: DbId,
        final_score: Option<&str>,
    ) -> StoreResult<Option<VotingRound>> {
        Ok(VotingRoundRepo::complete(&self.pool, round_id, final_score).await?)
    }

    async fn insert_chat_message(
        &self,
        session_id: DbId,
        user_id: DbId,
        message: &str,
        message_type: &str,
    ) -> StoreResult<ChatMessage> {
        Ok(ChatMessageRepo::create(&self.pool, session_id, user_id, message, message_type).await?)
    }

    async fn has_project_role(
        &self,
        session_id: DbId,
        user_id: DbId,
        roles: &[&str],
    ) -> StoreResult<bool> {
        Ok(ProjectMemberRepo::has_role_for_session(&self.pool, session_id, user_id, roles).await?)
    }
}
