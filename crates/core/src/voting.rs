//! Voting round lifecycle and vote admission rules.
//!
//! Rounds are numbered per topic starting at 1 and go `active -> completed`
//! exactly once. Completed rounds are kept as history.

use serde::{Deserialize, Serialize};

use crate::types::StatusId;

/// Maximum length of a score token such as `"13"`, `"?"` or `"☕"`.
pub const MAX_SCORE_LEN: usize = 16;

/// Voting round status.
///
/// Discriminants match the seed rows of `voting_round_statuses`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Active = 1,
    Completed = 2,
}

impl RoundStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Active),
            2 => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Validate and normalise a score token. Returns the trimmed token.
pub fn validate_score(score: &str) -> Result<String, String> {
    let trimmed = score.trim();
    if trimmed.is_empty() {
        return Err("Score must not be empty".to_string());
    }
    let len = trimmed.chars().count();
    if len > MAX_SCORE_LEN {
        return Err(format!(
            "Score must be at most {MAX_SCORE_LEN} characters, got {len}"
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional final score; `None` and blank both mean "no score".
pub fn validate_final_score(score: Option<&str>) -> Result<Option<String>, String> {
    match score {
        Some(s) if !s.trim().is_empty() => validate_score(s).map(Some),
        _ => Ok(None),
    }
}

/// Completion rule for a round: everyone counted as a participant has voted.
///
/// Evaluated against freshly read counts on every mutation.
pub fn all_voted(voted_count: i64, participant_count: i64) -> bool {
    voted_count >= participant_count
}
