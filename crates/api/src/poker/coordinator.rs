//! Session coordinator: the single entry point for real-time actions.
//!
//! Each operation validates against freshly read state, performs one
//! mutation, recomputes the affected snapshot from the store and only then
//! broadcasts. Errors go back to the requesting connection only.

use std::sync::Arc;

use axum::extract::ws::Message;
use planpoker_core::chat::{validate_message, MessageType};
use planpoker_core::planning::SessionStatus;
use planpoker_core::room_code::normalize_room_code;
use planpoker_core::types::DbId;
use planpoker_db::models::planning_session::PlanningSession;
use planpoker_db::models::user::UserSummary;
use planpoker_db::SessionStore;

use crate::poker::error::RealtimeError;
use crate::poker::events::{ClientEvent, RoomSnapshot, RoomTarget, RoundView, ServerEvent};
use crate::poker::voting::VotingRounds;
use crate::ws::WsManager;

pub struct SessionCoordinator {
    store: Arc<dyn SessionStore>,
    ws_manager: Arc<WsManager>,
    voting: VotingRounds,
}

impl SessionCoordinator {
    pub fn new(store: Arc<dyn SessionStore>, ws_manager: Arc<WsManager>) -> Self {
        let voting = VotingRounds::new(Arc::clone(&store));
        Self {
            store,
            ws_manager,
            voting,
        }
    }

    pub fn voting(&self) -> &VotingRounds {
        &self.voting
    }

    /// Decode and handle one inbound text frame, replying with an `error`
    /// event on failure.
    pub async fn handle_frame(&self, conn_id: &str, text: &str) {
        let result = match ClientEvent::parse(text) {
            Ok(event) => {
                let name = event.name();
                tracing::debug!(conn_id, event = name, "Client event received");
                self.dispatch(conn_id, event).await
            }
            Err(e) => Err(e),
        };
        if let Err(err) = result {
            self.report(conn_id, &err).await;
        }
    }

    pub async fn dispatch(&self, conn_id: &str, event: ClientEvent) -> Result<(), RealtimeError> {
        match event {
            ClientEvent::JoinRoom {
                session_id,
                room_code,
            } => {
                let target = RoomTarget::from_parts(session_id, room_code)?;
                self.join(conn_id, target).await
            }
            ClientEvent::LeaveRoom { session_id } => {
                self.leave(conn_id, session_id).await;
                Ok(())
            }
            ClientEvent::SubmitVote {
                topic_id,
                round_id,
                score,
            } => self.submit_vote(conn_id, topic_id, round_id, &score).await,
            ClientEvent::StartVoting { topic_id } => self.start_voting(conn_id, topic_id).await,
            ClientEvent::AcceptVotes {
                round_id,
                final_score,
            } => {
                self.accept_votes(conn_id, round_id, final_score.as_deref())
                    .await
            }
            ClientEvent::SendMessage {
                message,
                message_type,
            } => self.send_message(conn_id, &message, message_type).await,
        }
    }

    /// Join a room by session id or room code.
    ///
    /// A connection already in another room leaves it first. Re-joining the
    /// current room re-sends the snapshot without a second `user-joined`.
    pub async fn join(&self, conn_id: &str, target: RoomTarget) -> Result<(), RealtimeError> {
        let entry = self
            .ws_manager
            .get(conn_id)
            .await
            .ok_or(RealtimeError::AuthenticationFailed)?;
        let user = match self.store.get_user_by_id(entry.user.id).await? {
            Some(user) if user.is_active => UserSummary::from(&user),
            _ => return Err(RealtimeError::AuthenticationFailed),
        };

        let session = self
            .resolve_session(&target)
            .await?
            .ok_or(RealtimeError::SessionNotFound)?;
        if session.status() == SessionStatus::Completed {
            return Err(RealtimeError::SessionEnded);
        }

        if self.store.add_participant(session.id, user.id).await? {
            tracing::info!(session_id = session.id, user_id = user.id, "Participant added");
        }

        // Read everything the joiner needs before touching live membership,
        // so a failed read leaves the connection where it was.
        let state = self.snapshot(session.id).await?;

        // Disconnected while we were validating.
        let Some(moved) = self.ws_manager.join_room(conn_id, session.id).await else {
            return Ok(());
        };

        if let Some(previous) = moved.previous.filter(|p| *p != session.id) {
            let left = ServerEvent::UserLeft {
                user: moved.user.clone(),
            };
            self.broadcast(previous, &left, None).await;
        }

        let joined = ServerEvent::RoomJoined {
            session: session.clone().into(),
            state,
            user: user.clone(),
        };
        self.reply(conn_id, &joined).await;

        if moved.previous != Some(session.id) {
            self.broadcast(session.id, &ServerEvent::UserJoined { user }, Some(conn_id))
                .await;
            tracing::info!(conn_id, session_id = session.id, "Connection joined room");
        }
        Ok(())
    }

    /// Leave `session_id`. A no-op unless the connection is in that room.
    pub async fn leave(&self, conn_id: &str, session_id: DbId) {
        if let Some(user) = self.ws_manager.leave_room(conn_id, session_id).await {
            self.broadcast(session_id, &ServerEvent::UserLeft { user }, None)
                .await;
            tracing::info!(conn_id, session_id, "Connection left room");
        }
    }

    /// Transport-level close: leave whatever room the connection was in and
    /// forget the connection.
    pub async fn disconnect(&self, conn_id: &str) {
        let Some(entry) = self.ws_manager.remove(conn_id).await else {
            return;
        };
        if let Some(session_id) = entry.session_id {
            self.broadcast(session_id, &ServerEvent::UserLeft { user: entry.user }, None)
                .await;
            tracing::info!(conn_id, session_id, "Connection dropped from room");
        }
    }

    pub async fn submit_vote(
        &self,
        conn_id: &str,
        topic_id: DbId,
        round_id: DbId,
        score: &str,
    ) -> Result<(), RealtimeError> {
        let (user, session_id) = self.require_room(conn_id).await?;
        let voting_state = self
            .voting
            .submit_vote(session_id, topic_id, round_id, user.id, score)
            .await?;

        let all_voted = voting_state.all_voted;
        let submitted = ServerEvent::VoteSubmitted {
            topic_id,
            round_id,
            voting_state: voting_state.clone(),
            user,
        };
        self.broadcast(session_id, &submitted, None).await;

        if all_voted {
            let completed = ServerEvent::VotingCompleted {
                topic_id,
                round_id,
                voting_state,
            };
            self.broadcast(session_id, &completed, None).await;
        }
        Ok(())
    }

    pub async fn start_voting(&self, conn_id: &str, topic_id: DbId) -> Result<(), RealtimeError> {
        let (user, session_id) = self.require_room(conn_id).await?;
        let (round, voting_state) = self
            .voting
            .start_round(session_id, topic_id, user.id)
            .await?;

        let started = ServerEvent::VotingStarted {
            topic_id: round.topic_id,
            round_id: round.id,
            round_number: round.round_number,
            voting_state,
        };
        self.broadcast(session_id, &started, None).await;
        Ok(())
    }

    pub async fn accept_votes(
        &self,
        conn_id: &str,
        round_id: DbId,
        final_score: Option<&str>,
    ) -> Result<(), RealtimeError> {
        let (user, session_id) = self.require_room(conn_id).await?;
        let (round, voting_state) = self
            .voting
            .accept_votes(session_id, round_id, user.id, final_score)
            .await?;

        let accepted = ServerEvent::VotesAccepted {
            round_id: round.id,
            final_score: round.final_score.clone(),
            voting_state,
        };
        self.broadcast(session_id, &accepted, None).await;
        Ok(())
    }

    /// Persist a chat message and relay it to the whole room, sender included.
    pub async fn send_message(
        &self,
        conn_id: &str,
        message: &str,
        message_type: MessageType,
    ) -> Result<(), RealtimeError> {
        let (user, session_id) = self.require_room(conn_id).await?;
        let session = self
            .store
            .get_session_by_id(session_id)
            .await?
            .ok_or(RealtimeError::SessionNotFound)?;
        if !session.allow_chat {
            return Err(RealtimeError::ChatDisabled);
        }
        if message_type == MessageType::Emoticon && !session.allow_emoticons {
            return Err(RealtimeError::EmoticonsDisabled);
        }
        let message = validate_message(message).map_err(RealtimeError::InvalidRequest)?;

        let stored = self
            .store
            .insert_chat_message(session_id, user.id, &message, message_type.as_str())
            .await?;

        let event = ServerEvent::NewMessage {
            id: stored.id,
            message: stored.message,
            message_type: MessageType::from_db(&stored.message_type),
            user,
            created_at: stored.created_at,
        };
        self.broadcast(session_id, &event, None).await;
        Ok(())
    }

    /// Participants, topics and the current round of a session.
    pub async fn snapshot(&self, session_id: DbId) -> Result<RoomSnapshot, RealtimeError> {
        let participants = self.store.list_participants(session_id).await?;
        let topics = self.store.list_topics(session_id).await?;
        let active_round = self.store.get_active_round_for_session(session_id).await?;
        let voting_state = match &active_round {
            Some(round) => Some(self.voting.voting_state(round).await?),
            None => None,
        };
        Ok(RoomSnapshot {
            participants,
            topics,
            active_round: active_round.map(RoundView::from),
            voting_state,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn resolve_session(
        &self,
        target: &RoomTarget,
    ) -> Result<Option<PlanningSession>, RealtimeError> {
        match target {
            RoomTarget::Id(id) => Ok(self.store.get_session_by_id(*id).await?),
            RoomTarget::Code(code) => match normalize_room_code(code) {
                Some(code) => Ok(self.store.get_session_by_room_code(&code).await?),
                None => Ok(None),
            },
        }
    }

    async fn require_room(&self, conn_id: &str) -> Result<(UserSummary, DbId), RealtimeError> {
        let entry = self
            .ws_manager
            .get(conn_id)
            .await
            .ok_or(RealtimeError::NotInRoom)?;
        let session_id = entry.session_id.ok_or(RealtimeError::NotInRoom)?;
        Ok((entry.user, session_id))
    }

    async fn report(&self, conn_id: &str, err: &RealtimeError) {
        match err {
            RealtimeError::Store(e) => {
                tracing::error!(conn_id, error = %e, "Real-time action failed in store");
            }
            other => {
                tracing::debug!(conn_id, error = %other, "Real-time action rejected");
            }
        }
        self.reply(conn_id, &ServerEvent::error(err)).await;
    }

    /// Queue an event for one connection only.
    pub async fn reply(&self, conn_id: &str, event: &ServerEvent) {
        self.ws_manager
            .send_to(conn_id, Message::Text(event.encode().into()))
            .await;
    }

    async fn broadcast(&self, session_id: DbId, event: &ServerEvent, exclude: Option<&str>) {
        let message = Message::Text(event.encode().into());
        let count = self
            .ws_manager
            .broadcast_room(session_id, message, exclude)
            .await;
        tracing::trace!(session_id, count, "Broadcast room event");
    }
}
