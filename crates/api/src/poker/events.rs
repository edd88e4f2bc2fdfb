//! Real-time wire protocol.
//!
//! Every frame is a JSON text message internally tagged by `"type"` with a
//! kebab-case event name. Event fields are camelCase; nested database rows
//! keep their column names.

use planpoker_core::chat::MessageType;
use planpoker_core::planning::SessionStatus;
use planpoker_core::types::{DbId, Timestamp};
use planpoker_core::voting::RoundStatus;
use planpoker_db::models::participant::ParticipantInfo;
use planpoker_db::models::planning_session::PlanningSession;
use planpoker_db::models::topic::Topic;
use planpoker_db::models::user::UserSummary;
use planpoker_db::models::vote::VoteInfo;
use planpoker_db::models::voting_round::VotingRound;
use serde::{Deserialize, Serialize};

use crate::poker::error::RealtimeError;

/// Client -> server events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        #[serde(default)]
        session_id: Option<DbId>,
        #[serde(default)]
        room_code: Option<String>,
    },
    LeaveRoom {
        session_id: DbId,
    },
    SubmitVote {
        topic_id: DbId,
        round_id: DbId,
        score: String,
    },
    StartVoting {
        topic_id: DbId,
    },
    AcceptVotes {
        round_id: DbId,
        #[serde(default)]
        final_score: Option<String>,
    },
    SendMessage {
        message: String,
        #[serde(default)]
        message_type: MessageType,
    },
}

impl ClientEvent {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, RealtimeError> {
        serde_json::from_str(text)
            .map_err(|e| RealtimeError::InvalidRequest(format!("Malformed event: {e}")))
    }

    /// Event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::SubmitVote { .. } => "submit-vote",
            Self::StartVoting { .. } => "start-voting",
            Self::AcceptVotes { .. } => "accept-votes",
            Self::SendMessage { .. } => "send-message",
        }
    }
}

/// How a client names the room it wants to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTarget {
    Id(DbId),
    Code(String),
}

impl RoomTarget {
    /// Session id wins when both are given.
    pub fn from_parts(
        session_id: Option<DbId>,
        room_code: Option<String>,
    ) -> Result<Self, RealtimeError> {
        match (session_id, room_code) {
            (Some(id), _) => Ok(Self::Id(id)),
            (None, Some(code)) => Ok(Self::Code(code)),
            (None, None) => Err(RealtimeError::InvalidRequest(
                "join-room requires sessionId or roomCode".to_string(),
            )),
        }
    }
}

/// Session row plus its decoded lifecycle status.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: PlanningSession,
    pub status: SessionStatus,
}

impl From<PlanningSession> for SessionView {
    fn from(session: PlanningSession) -> Self {
        let status = session.status();
        Self { session, status }
    }
}

/// Round row plus its decoded status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    #[serde(flatten)]
    pub round: VotingRound,
    pub status: RoundStatus,
}

impl From<VotingRound> for RoundView {
    fn from(round: VotingRound) -> Self {
        let status = round.status();
        Self { round, status }
    }
}

/// Freshly computed state of one voting round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingState {
    pub round: RoundView,
    pub votes: Vec<VoteInfo>,
    pub participant_count: i64,
    pub voted_count: i64,
    pub all_voted: bool,
}

/// Everything a client needs to render a room after joining.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub participants: Vec<ParticipantInfo>,
    pub topics: Vec<Topic>,
    pub active_round: Option<RoundView>,
    pub voting_state: Option<VotingState>,
}

/// Server -> client events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    RoomJoined {
        session: SessionView,
        state: RoomSnapshot,
        user: UserSummary,
    },
    UserJoined {
        user: UserSummary,
    },
    UserLeft {
        user: UserSummary,
    },
    VoteSubmitted {
        topic_id: DbId,
        round_id: DbId,
        voting_state: VotingState,
        user: UserSummary,
    },
    VotingCompleted {
        topic_id: DbId,
        round_id: DbId,
        voting_state: VotingState,
    },
    VotingStarted {
        topic_id: DbId,
        round_id: DbId,
        round_number: i32,
        voting_state: VotingState,
    },
    VotesAccepted {
        round_id: DbId,
        final_score: Option<String>,
        voting_state: VotingState,
    },
    NewMessage {
        id: DbId,
        message: String,
        message_type: MessageType,
        user: UserSummary,
        created_at: Timestamp,
    },
    Error {
        message: String,
        code: &'static str,
    },
}

impl ServerEvent {
    pub fn error(err: &RealtimeError) -> Self {
        Self::Error {
            message: err.client_message(),
            code: err.code(),
        }
    }

    /// Encode as a JSON text frame payload.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode server event");
            r#"{"type":"error","message":"Something went wrong, please try again","code":"INTERNAL_ERROR"}"#
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parses_join_by_room_code() {
        let event = ClientEvent::parse(r#"{"type":"join-room","roomCode":"ab12cd"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                session_id: None,
                room_code: Some("ab12cd".to_string()),
            }
        );
    }

    #[test]
    fn parses_camel_case_fields() {
        let event =
            ClientEvent::parse(r#"{"type":"submit-vote","topicId":1,"roundId":2,"score":"?"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::SubmitVote {
                topic_id: 1,
                round_id: 2,
                score: "?".to_string(),
            }
        );
    }

    #[test]
    fn optional_fields_default() {
        let accept = ClientEvent::parse(r#"{"type":"accept-votes","roundId":9}"#).unwrap();
        assert_eq!(
            accept,
            ClientEvent::AcceptVotes {
                round_id: 9,
                final_score: None,
            }
        );

        let chat = ClientEvent::parse(r#"{"type":"send-message","message":"hi"}"#).unwrap();
        assert_matches!(
            chat,
            ClientEvent::SendMessage { message_type: MessageType::Text, .. }
        );
    }

    #[test]
    fn unknown_or_incomplete_events_are_invalid() {
        assert_matches!(
            ClientEvent::parse(r#"{"type":"dance"}"#),
            Err(RealtimeError::InvalidRequest(_))
        );
        assert_matches!(
            ClientEvent::parse(r#"{"type":"start-voting"}"#),
            Err(RealtimeError::InvalidRequest(_))
        );
        assert_matches!(ClientEvent::parse("not json"), Err(RealtimeError::InvalidRequest(_)));
    }

    #[test]
    fn room_target_prefers_session_id() {
        assert_eq!(
            RoomTarget::from_parts(Some(4), Some("ABC123".to_string())).unwrap(),
            RoomTarget::Id(4)
        );
        assert_eq!(
            RoomTarget::from_parts(None, Some("ABC123".to_string())).unwrap(),
            RoomTarget::Code("ABC123".to_string())
        );
        assert!(RoomTarget::from_parts(None, None).is_err());
    }

    #[test]
    fn server_events_are_tagged_kebab_case() {
        let user = UserSummary {
            id: 3,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::UserLeft { user }.encode()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "user-left",
                "user": { "id": 3, "name": "Ada", "email": "ada@example.com" }
            })
        );

        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::error(&RealtimeError::NotInRoom).encode()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "NOT_IN_ROOM");
        assert_eq!(value["message"], "You are not in a room");
    }

    #[test]
    fn round_view_carries_decoded_status() {
        let round = VotingRound {
            id: 11,
            session_id: 2,
            topic_id: 5,
            round_number: 3,
            status_id: RoundStatus::Completed.id(),
            final_score: Some("8".to_string()),
            started_at: chrono::Utc::now(),
            ended_at: None,
        };
        let value = serde_json::to_value(RoundView::from(round)).unwrap();

        assert_eq!(value["id"], 11);
        assert_eq!(value["round_number"], 3);
        assert_eq!(value["status_id"], RoundStatus::Completed.id());
        assert_eq!(value["status"], "completed");
        assert_eq!(value["final_score"], "8");
    }
}
