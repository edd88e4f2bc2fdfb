//! In-process [`SessionStore`] used by coordinator tests.
//!
//! Mirrors the unique constraints of the PostgreSQL schema and reports
//! violations with the same constraint names. Each mutation runs under a
//! single lock, so check-and-insert is atomic here just as it is in SQL.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use planpoker_core::planning::SessionStatus;
use planpoker_core::roles::ROLE_USER;
use planpoker_core::types::DbId;
use planpoker_core::voting::RoundStatus;

use crate::models::chat_message::ChatMessage;
use crate::models::participant::{Participant, ParticipantInfo};
use crate::models::planning_session::{CreatePlanningSession, PlanningSession};
use crate::models::topic::{CreateTopic, Topic};
use crate::models::user::User;
use crate::models::vote::{Vote, VoteInfo};
use crate::models::voting_round::VotingRound;
use crate::store::{constraints, SessionStore, StoreError, StoreResult};

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    users: BTreeMap<DbId, User>,
    /// (project_id, user_id, role)
    project_members: Vec<(DbId, DbId, String)>,
    sessions: BTreeMap<DbId, PlanningSession>,
    participants: Vec<Participant>,
    topics: BTreeMap<DbId, Topic>,
    rounds: BTreeMap<DbId, VotingRound>,
    votes: Vec<Vote>,
    chat_messages: Vec<ChatMessage>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict {
        constraint: constraint.to_string(),
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Insert an active user with the global `user` role.
    pub fn insert_user(&self, name: &str, email: &str) -> User {
        let mut state = self.state();
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: email.to_string(),
            name: name.to_string(),
            role: ROLE_USER.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub fn set_user_active(&self, user_id: DbId, is_active: bool) {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.is_active = is_active;
        }
    }

    pub fn add_project_member(&self, project_id: DbId, user_id: DbId, role: &str) {
        let mut state = self.state();
        state
            .project_members
            .retain(|(p, u, _)| !(*p == project_id && *u == user_id));
        state
            .project_members
            .push((project_id, user_id, role.to_string()));
    }

    pub fn insert_session(&self, input: &CreatePlanningSession) -> StoreResult<PlanningSession> {
        let mut state = self.state();
        if state
            .sessions
            .values()
            .any(|s| s.room_code == input.room_code)
        {
            return Err(conflict(constraints::ROOM_CODE));
        }
        let now = Utc::now();
        let session = PlanningSession {
            id: state.next_id(),
            title: input.title.clone(),
            project_id: input.project_id,
            created_by: input.created_by,
            room_code: input.room_code.clone(),
            metrics: input.metrics.clone(),
            status_id: input.status_id,
            allow_chat: input.allow_chat,
            allow_emoticons: input.allow_emoticons,
            notify_email: input.notify_email,
            scheduled_at: input.scheduled_at,
            started_at: None,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    pub fn set_session_status(&self, session_id: DbId, status: SessionStatus) {
        if let Some(session) = self.state().sessions.get_mut(&session_id) {
            session.status_id = status.id();
            session.updated_at = Utc::now();
        }
    }

    pub fn set_session_flags(&self, session_id: DbId, allow_chat: bool, allow_emoticons: bool) {
        if let Some(session) = self.state().sessions.get_mut(&session_id) {
            session.allow_chat = allow_chat;
            session.allow_emoticons = allow_emoticons;
        }
    }

    pub fn insert_topic(&self, session_id: DbId, input: &CreateTopic) -> Topic {
        let mut state = self.state();
        let topic = Topic {
            id: state.next_id(),
            session_id,
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            parent_id: input.parent_id,
            order_index: input.order_index,
            created_at: Utc::now(),
        };
        state.topics.insert(topic.id, topic.clone());
        topic
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn votes_for_round(&self, round_id: DbId) -> Vec<Vote> {
        self.state()
            .votes
            .iter()
            .filter(|v| v.round_id == round_id)
            .cloned()
            .collect()
    }

    pub fn rounds_for_topic(&self, topic_id: DbId) -> Vec<VotingRound> {
        self.state()
            .rounds
            .values()
            .filter(|r| r.topic_id == topic_id)
            .cloned()
            .collect()
    }

    pub fn chat_messages(&self, session_id: DbId) -> Vec<ChatMessage> {
        self.state()
            .chat_messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn participant_rows(&self, session_id: DbId) -> usize {
        self.state()
            .participants
            .iter()
            .filter(|p| p.session_id == session_id)
            .count()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_user_by_id(&self, user_id: DbId) -> StoreResult<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn get_session_by_id(&self, session_id: DbId) -> StoreResult<Option<PlanningSession>> {
        Ok(self.state().sessions.get(&session_id).cloned())
    }

    async fn get_session_by_room_code(
        &self,
        room_code: &str,
    ) -> StoreResult<Option<PlanningSession>> {
        Ok(self
            .state()
            .sessions
            .values()
            .find(|s| s.room_code == room_code)
            .cloned())
    }

    async fn is_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool> {
        Ok(self
            .state()
            .participants
            .iter()
            .any(|p| p.session_id == session_id && p.user_id == user_id))
    }

    async fn add_participant(&self, session_id: DbId, user_id: DbId) -> StoreResult<bool> {
        let mut state = self.state();
        if state
            .participants
            .iter()
            .any(|p| p.session_id == session_id && p.user_id == user_id)
        {
            return Ok(false);
        }
        let participant = Participant {
            id: state.next_id(),
            session_id,
            user_id,
            joined_at: Utc::now(),
        };
        state.participants.push(participant);
        Ok(true)
    }

    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<ParticipantInfo>> {
        let state = self.state();
        Ok(state
            .participants
            .iter()
            .filter(|p| p.session_id == session_id)
            .filter_map(|p| {
                state.users.get(&p.user_id).map(|u| ParticipantInfo {
                    user_id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    joined_at: p.joined_at,
                })
            })
            .collect())
    }

    async fn count_participants(&self, session_id: DbId) -> StoreResult<i64> {
        Ok(self.participant_rows(session_id) as i64)
    }

    async fn list_topics(&self, session_id: DbId) -> StoreResult<Vec<Topic>> {
        let mut topics: Vec<Topic> = self
            .state()
            .topics
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| (t.order_index, t.created_at, t.id));
        Ok(topics)
    }

    async fn get_topic(&self, topic_id: DbId) -> StoreResult<Option<Topic>> {
        Ok(self.state().topics.get(&topic_id).cloned())
    }

    async fn get_active_round_for_topic(&self, topic_id: DbId) -> StoreResult<Option<VotingRound>> {
        Ok(self
            .state()
            .rounds
            .values()
            .find(|r| r.topic_id == topic_id && r.is_active())
            .cloned())
    }

    async fn get_active_round_for_session(
        &self,
        session_id: DbId,
    ) -> StoreResult<Option<VotingRound>> {
        Ok(self
            .state()
            .rounds
            .values()
            .filter(|r| r.session_id == session_id && r.is_active())
            .max_by_key(|r| (r.started_at, r.id))
            .cloned())
    }

    async fn create_round(&self, session_id: DbId, topic_id: DbId) -> StoreResult<VotingRound> {
        let mut state = self.state();
        let existing = state.rounds.values().filter(|r| r.topic_id == topic_id);
        let mut max_number = 0;
        for round in existing {
            if round.is_active() {
                return Err(conflict(constraints::ACTIVE_ROUND));
            }
            max_number = max_number.max(round.round_number);
        }
        let round = VotingRound {
            id: state.next_id(),
            session_id,
            topic_id,
            round_number: max_number + 1,
            status_id: RoundStatus::Active.id(),
            final_score: None,
            started_at: Utc::now(),
            ended_at: None,
        };
        state.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn get_round(&self, round_id: DbId) -> StoreResult<Option<VotingRound>> {
        Ok(self.state().rounds.get(&round_id).cloned())
    }

    async fn get_vote(&self, round_id: DbId, user_id: DbId) -> StoreResult<Option<Vote>> {
        Ok(self
            .state()
            .votes
            .iter()
            .find(|v| v.round_id == round_id && v.user_id == user_id)
            .cloned())
    }

    async fn insert_vote(
        &self,
        round_id: DbId,
        user_id: DbId,
        score: &str,
    ) -> StoreResult<Option<Vote>> {
        let mut state = self.state();
        if !state.rounds.get(&round_id).is_some_and(|r| r.is_active()) {
            return Ok(None);
        }
        if state
            .votes
            .iter()
            .any(|v| v.round_id == round_id && v.user_id == user_id)
        {
            return Err(conflict(constraints::VOTE));
        }
        let vote = Vote {
            id: state.next_id(),
            round_id,
            user_id,
            score: score.to_string(),
            voted_at: Utc::now(),
        };
        state.votes.push(vote.clone());
        Ok(Some(vote))
    }

    async fn list_votes_for_round(&self, round_id: DbId) -> StoreResult<Vec<VoteInfo>> {
        let state = self.state();
        Ok(state
            .votes
            .iter()
            .filter(|v| v.round_id == round_id)
            .map(|v| VoteInfo {
                user_id: v.user_id,
                name: state
                    .users
                    .get(&v.user_id)
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
                score: v.score.clone(),
                voted_at: v.voted_at,
            })
            .collect())
    }

    async fn complete_round(
        &self,
        round_id: DbId,
        final_score: Option<&str>,
    ) -> StoreResult<Option<VotingRound>> {
        let mut state = self.state();
        match state.rounds.get_mut(&round_id) {
            Some(round) if round.is_active() => {
                round.status_id = RoundStatus::Completed.id();
                round.final_score = final_score.map(str::to_string);
                round.ended_at = Some(Utc::now());
                Ok(Some(round.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_chat_message(
        &self,
        session_id: DbId,
        user_id: DbId,
        message: &str,
        message_type: &str,
    ) -> StoreResult<ChatMessage> {
        let mut state = self.state();
        let chat_message = ChatMessage {
            id: state.next_id(),
            session_id,
            user_id,
            message: message.to_string(),
            message_type: message_type.to_string(),
            created_at: Utc::now(),
        };
        state.chat_messages.push(chat_message.clone());
        Ok(chat_message)
    }

    async fn has_project_role(
        &self,
        session_id: DbId,
        user_id: DbId,
        roles: &[&str],
    ) -> StoreResult<bool> {
        let state = self.state();
        let Some(session) = state.sessions.get(&session_id) else {
            return Ok(false);
        };
        Ok(state.project_members.iter().any(|(project_id, member_id, role)| {
            *project_id == session.project_id
                && *member_id == user_id
                && roles.contains(&role.as_str())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use planpoker_core::roles::{PROJECT_ROLE_MEMBER, PROJECT_ROLE_PRODUCT_OWNER, MANAGING_ROLES};

    fn session_input(room_code: &str) -> CreatePlanningSession {
        CreatePlanningSession {
            title: "Sprint 12".to_string(),
            project_id: 1,
            created_by: 1,
            room_code: room_code.to_string(),
            metrics: None,
            status_id: SessionStatus::Active.id(),
            allow_chat: true,
            allow_emoticons: true,
            notify_email: false,
            scheduled_at: None,
        }
    }

    fn topic_input(title: &str, order_index: i32) -> CreateTopic {
        CreateTopic {
            title: title.to_string(),
            description: None,
            parent_id: None,
            order_index,
        }
    }

    #[tokio::test]
    async fn duplicate_room_code_is_a_conflict() {
        let store = MemorySessionStore::new();
        store.insert_session(&session_input("ABC123")).unwrap();
        let err = store.insert_session(&session_input("ABC123")).unwrap_err();
        assert!(err.is_conflict_on(constraints::ROOM_CODE));
    }

    #[tokio::test]
    async fn add_participant_is_idempotent() {
        let store = MemorySessionStore::new();
        let user = store.insert_user("Ada", "ada@example.com");
        let session = store.insert_session(&session_input("ABC123")).unwrap();

        assert!(store.add_participant(session.id, user.id).await.unwrap());
        assert!(!store.add_participant(session.id, user.id).await.unwrap());
        assert_eq!(store.count_participants(session.id).await.unwrap(), 1);
        assert!(store.is_participant(session.id, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn rounds_are_numbered_per_topic_and_one_active_at_a_time() {
        let store = MemorySessionStore::new();
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        let topic = store.insert_topic(session.id, &topic_input("Login", 0));
        let other = store.insert_topic(session.id, &topic_input("Signup", 1));

        let first = store.create_round(session.id, topic.id).await.unwrap();
        assert_eq!(first.round_number, 1);
        assert_matches!(
            store.create_round(session.id, topic.id).await,
            Err(StoreError::Conflict { constraint }) if constraint == constraints::ACTIVE_ROUND
        );

        let other_round = store.create_round(session.id, other.id).await.unwrap();
        assert_eq!(other_round.round_number, 1);

        store.complete_round(first.id, Some("5")).await.unwrap().unwrap();
        let second = store.create_round(session.id, topic.id).await.unwrap();
        assert_eq!(second.round_number, 2);
    }

    #[tokio::test]
    async fn completing_twice_returns_none() {
        let store = MemorySessionStore::new();
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        let topic = store.insert_topic(session.id, &topic_input("Login", 0));
        let round = store.create_round(session.id, topic.id).await.unwrap();

        let done = store.complete_round(round.id, Some("8")).await.unwrap().unwrap();
        assert_eq!(done.final_score.as_deref(), Some("8"));
        assert!(done.ended_at.is_some());
        assert!(store.complete_round(round.id, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_vote_is_rejected_and_first_is_kept() {
        let store = MemorySessionStore::new();
        let user = store.insert_user("Ada", "ada@example.com");
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        let topic = store.insert_topic(session.id, &topic_input("Login", 0));
        let round = store.create_round(session.id, topic.id).await.unwrap();

        store.insert_vote(round.id, user.id, "5").await.unwrap().unwrap();
        let err = store.insert_vote(round.id, user.id, "13").await.unwrap_err();
        assert!(err.is_conflict_on(constraints::VOTE));

        let vote = store.get_vote(round.id, user.id).await.unwrap().unwrap();
        assert_eq!(vote.score, "5");
        assert_eq!(store.votes_for_round(round.id).len(), 1);
    }

    #[tokio::test]
    async fn votes_on_completed_rounds_are_not_stored() {
        let store = MemorySessionStore::new();
        let user = store.insert_user("Ada", "ada@example.com");
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        let topic = store.insert_topic(session.id, &topic_input("Login", 0));
        let round = store.create_round(session.id, topic.id).await.unwrap();
        store.complete_round(round.id, None).await.unwrap();

        assert!(store.insert_vote(round.id, user.id, "5").await.unwrap().is_none());
        assert!(store.insert_vote(999, user.id, "5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn topics_follow_order_index() {
        let store = MemorySessionStore::new();
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        store.insert_topic(session.id, &topic_input("Third", 3));
        store.insert_topic(session.id, &topic_input("First", 1));
        store.insert_topic(session.id, &topic_input("Second", 2));

        let titles: Vec<String> = store
            .list_topics(session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn project_roles_are_scoped_to_the_session_project() {
        let store = MemorySessionStore::new();
        let owner = store.insert_user("Olive", "olive@example.com");
        let member = store.insert_user("Max", "max@example.com");
        let session = store.insert_session(&session_input("ABC123")).unwrap();
        store.add_project_member(session.project_id, owner.id, PROJECT_ROLE_PRODUCT_OWNER);
        store.add_project_member(session.project_id, member.id, PROJECT_ROLE_MEMBER);
        store.add_project_member(session.project_id + 1, member.id, PROJECT_ROLE_PRODUCT_OWNER);

        assert!(store.has_project_role(session.id, owner.id, MANAGING_ROLES).await.unwrap());
        assert!(!store.has_project_role(session.id, member.id, MANAGING_ROLES).await.unwrap());
        assert!(!store.has_project_role(999, owner.id, MANAGING_ROLES).await.unwrap());
    }
}
