use planpoker_db::StoreError;

/// Failure of a real-time action. Reported only to the connection that
/// issued the action, as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session has ended")]
    SessionEnded,

    #[error("Session is not open for voting")]
    SessionNotJoinable,

    #[error("You are not in a room")]
    NotInRoom,

    #[error("Only the product owner or product manager can do this")]
    PermissionDenied,

    #[error("Topic not found")]
    TopicNotFound,

    #[error("Voting round not found")]
    RoundNotFound,

    #[error("A voting round is already active for this topic")]
    RoundAlreadyActive,

    #[error("Voting round is not active")]
    RoundNotActive,

    #[error("You have already voted in this round")]
    DuplicateVote,

    #[error("Chat is disabled for this session")]
    ChatDisabled,

    #[error("Emoticons are disabled for this session")]
    EmoticonsDisabled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RealtimeError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionEnded => "SESSION_ENDED",
            Self::SessionNotJoinable => "SESSION_NOT_JOINABLE",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::TopicNotFound => "TOPIC_NOT_FOUND",
            Self::RoundNotFound => "ROUND_NOT_FOUND",
            Self::RoundAlreadyActive => "ROUND_ALREADY_ACTIVE",
            Self::RoundNotActive => "ROUND_NOT_ACTIVE",
            Self::DuplicateVote => "DUPLICATE_VOTE",
            Self::ChatDisabled => "CHAT_DISABLED",
            Self::EmoticonsDisabled => "EMOTICONS_DISABLED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show the client. Store failures never leak detail.
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_sanitized() {
        let err = RealtimeError::Store(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(!err.client_message().contains("pool"));
    }

    #[test]
    fn domain_errors_keep_their_message() {
        assert_eq!(
            RealtimeError::DuplicateVote.client_message(),
            "You have already voted in this round"
        );
        assert_eq!(RealtimeError::ChatDisabled.code(), "CHAT_DISABLED");
    }
}
