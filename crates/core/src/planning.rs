//! Planning session lifecycle and field validation.
//!
//! Lifecycle: `draft -> scheduled | active -> completed`. A scheduled
//! session may still be started; any non-completed session may be ended.
//! Completed is terminal.

use serde::{Deserialize, Serialize};

use crate::types::StatusId;

/// Minimum length of a session title.
pub const MIN_TITLE_LEN: usize = 2;

/// Maximum length of a session title.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of the free-form metrics description.
pub const MAX_METRICS_LEN: usize = 500;

/// Maximum length of a topic title.
pub const MAX_TOPIC_TITLE_LEN: usize = 300;

/// Planning session lifecycle status.
///
/// Discriminants match the seed rows of `planning_session_statuses`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Draft = 1,
    Scheduled = 2,
    Active = 3,
    Completed = 4,
}

impl SessionStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Draft),
            2 => Some(Self::Scheduled),
            3 => Some(Self::Active),
            4 => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// A room can be joined (and voted in) until the session is completed.
    pub fn is_joinable(self) -> bool {
        self != Self::Completed
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Scheduled)
                | (Self::Draft, Self::Active)
                | (Self::Scheduled, Self::Active)
                | (Self::Draft, Self::Completed)
                | (Self::Scheduled, Self::Completed)
                | (Self::Active, Self::Completed)
        )
    }

    /// Initial status for a newly created session.
    pub fn initial(has_schedule: bool) -> Self {
        if has_schedule {
            Self::Scheduled
        } else {
            Self::Draft
        }
    }
}

/// Validate a session title. Returns `Ok(())` or an error message.
pub fn validate_title(title: &str) -> Result<(), String> {
    let len = title.trim().chars().count();
    if len < MIN_TITLE_LEN || len > MAX_TITLE_LEN {
        return Err(format!(
            "Title must be between {MIN_TITLE_LEN} and {MAX_TITLE_LEN} characters, got {len}"
        ));
    }
    Ok(())
}

/// Validate the optional metrics description.
pub fn validate_metrics(metrics: Option<&str>) -> Result<(), String> {
    match metrics {
        Some(m) if m.chars().count() > MAX_METRICS_LEN => Err(format!(
            "Metrics must be at most {MAX_METRICS_LEN} characters"
        )),
        _ => Ok(()),
    }
}

/// Validate a topic title.
pub fn validate_topic_title(title: &str) -> Result<(), String> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err("Topic title must not be empty".to_string());
    }
    if len > MAX_TOPIC_TITLE_LEN {
        return Err(format!(
            "Topic title must be at most {MAX_TOPIC_TITLE_LEN} characters, got {len}"
        ));
    }
    Ok(())
}
