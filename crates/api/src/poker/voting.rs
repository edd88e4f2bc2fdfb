//! Voting round state machine.
//!
//! Per topic: no active round -> active -> completed, after which a new
//! round may start. Completed rounds are kept as history. Every transition
//! re-reads its preconditions from the store and every returned
//! [`VotingState`] is computed after the write, never cached.

use std::sync::Arc;

use planpoker_core::roles::MANAGING_ROLES;
use planpoker_core::types::DbId;
use planpoker_core::voting::{all_voted, validate_final_score, validate_score};
use planpoker_db::models::voting_round::VotingRound;
use planpoker_db::store::constraints;
use planpoker_db::SessionStore;

use crate::poker::error::RealtimeError;
use crate::poker::events::VotingState;

pub struct VotingRounds {
    store: Arc<dyn SessionStore>,
}

impl VotingRounds {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Open the next round for `topic_id`.
    ///
    /// Rejected while another round for the topic is active, including when
    /// a concurrent start wins the race.
    pub async fn start_round(
        &self,
        session_id: DbId,
        topic_id: DbId,
        requested_by: DbId,
    ) -> Result<(VotingRound, VotingState), RealtimeError> {
        let session = self
            .store
            .get_session_by_id(session_id)
            .await?
            .ok_or(RealtimeError::SessionNotFound)?;

        self.require_manager(session_id, requested_by).await?;

        if !session.status().is_joinable() {
            return Err(RealtimeError::SessionNotJoinable);
        }

        match self.store.get_topic(topic_id).await? {
            Some(topic) if topic.session_id == session_id => {}
            _ => return Err(RealtimeError::TopicNotFound),
        }

        if self.store.get_active_round_for_topic(topic_id).await?.is_some() {
            return Err(RealtimeError::RoundAlreadyActive);
        }

        let round = match self.store.create_round(session_id, topic_id).await {
            Ok(round) => round,
            Err(e)
                if e.is_conflict_on(constraints::ACTIVE_ROUND)
                    || e.is_conflict_on(constraints::ROUND_NUMBER) =>
            {
                return Err(RealtimeError::RoundAlreadyActive);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            session_id,
            topic_id,
            round_id = round.id,
            round_number = round.round_number,
            "Voting round started"
        );

        let state = self.voting_state(&round).await?;
        Ok((round, state))
    }

    /// Record `user_id`'s vote in an active round of the session.
    pub async fn submit_vote(
        &self,
        session_id: DbId,
        topic_id: DbId,
        round_id: DbId,
        user_id: DbId,
        score: &str,
    ) -> Result<VotingState, RealtimeError> {
        let score = validate_score(score).map_err(RealtimeError::InvalidRequest)?;

        let round = self.round_in_session(session_id, round_id).await?;
        if round.topic_id != topic_id {
            return Err(RealtimeError::RoundNotFound);
        }
        if !round.is_active() {
            return Err(RealtimeError::RoundNotActive);
        }
        if self.store.get_vote(round_id, user_id).await?.is_some() {
            return Err(RealtimeError::DuplicateVote);
        }

        match self.store.insert_vote(round_id, user_id, &score).await {
            Ok(Some(_)) => {}
            // The round was completed after the check above.
            Ok(None) => return Err(RealtimeError::RoundNotActive),
            Err(e) if e.is_conflict_on(constraints::VOTE) => {
                return Err(RealtimeError::DuplicateVote);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(session_id, round_id, user_id, "Vote recorded");

        let round = self.round_in_session(session_id, round_id).await?;
        self.voting_state(&round).await
    }

    /// Close an active round with an optional final score.
    pub async fn accept_votes(
        &self,
        session_id: DbId,
        round_id: DbId,
        requested_by: DbId,
        final_score: Option<&str>,
    ) -> Result<(VotingRound, VotingState), RealtimeError> {
        let final_score =
            validate_final_score(final_score).map_err(RealtimeError::InvalidRequest)?;

        self.require_manager(session_id, requested_by).await?;

        let round = self.round_in_session(session_id, round_id).await?;
        if !round.is_active() {
            return Err(RealtimeError::RoundNotActive);
        }

        let round = self
            .store
            .complete_round(round_id, final_score.as_deref())
            .await?
            .ok_or(RealtimeError::RoundNotActive)?;

        tracing::info!(
            session_id,
            round_id,
            final_score = round.final_score.as_deref().unwrap_or(""),
            "Voting round accepted"
        );

        let state = self.voting_state(&round).await?;
        Ok((round, state))
    }

    /// Votes and completion of a round, read fresh from the store.
    pub async fn voting_state(&self, round: &VotingRound) -> Result<VotingState, RealtimeError> {
        let votes = self.store.list_votes_for_round(round.id).await?;
        let participant_count = self.store.count_participants(round.session_id).await?;
        let voted_count = votes.len() as i64;
        Ok(VotingState {
            round: round.clone().into(),
            votes,
            participant_count,
            voted_count,
            all_voted: all_voted(voted_count, participant_count),
        })
    }

    async fn require_manager(&self, session_id: DbId, user_id: DbId) -> Result<(), RealtimeError> {
        if self
            .store
            .has_project_role(session_id, user_id, MANAGING_ROLES)
            .await?
        {
            Ok(())
        } else {
            Err(RealtimeError::PermissionDenied)
        }
    }

    async fn round_in_session(
        &self,
        session_id: DbId,
        round_id: DbId,
    ) -> Result<VotingRound, RealtimeError> {
        match self.store.get_round(round_id).await? {
            Some(round) if round.session_id == session_id => Ok(round),
            _ => Err(RealtimeError::RoundNotFound),
        }
    }
}
