//! Planning session model and DTOs.

use planpoker_core::planning::SessionStatus;
use planpoker_core::types::{DbId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `planning_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlanningSession {
    pub id: DbId,
    pub title: String,
    pub project_id: DbId,
    pub created_by: DbId,
    pub room_code: String,
    pub metrics: Option<String>,
    pub status_id: StatusId,
    pub allow_chat: bool,
    pub allow_emoticons: bool,
    pub notify_email: bool,
    pub scheduled_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PlanningSession {
    /// Lifecycle status. The `status_id` foreign key guarantees a known value;
    /// anything else is treated as completed so it can never be joined.
    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_id(self.status_id).unwrap_or(SessionStatus::Completed)
    }
}

/// DTO for inserting a planning session. The room code is generated by the
/// caller.
#[derive(Debug, Clone)]
pub struct CreatePlanningSession {
    pub title: String,
    pub project_id: DbId,
    pub created_by: DbId,
    pub room_code: String,
    pub metrics: Option<String>,
    pub status_id: StatusId,
    pub allow_chat: bool,
    pub allow_emoticons: bool,
    pub notify_email: bool,
    pub scheduled_at: Option<Timestamp>,
}

/// Request body for `POST /planning-sessions`.
#[derive(Debug, Deserialize)]
pub struct CreatePlanningSessionRequest {
    pub title: String,
    pub project_id: DbId,
    pub metrics: Option<String>,
    pub scheduled_at: Option<Timestamp>,
    #[serde(default = "default_true")]
    pub allow_chat: bool,
    #[serde(default = "default_true")]
    pub allow_emoticons: bool,
    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub topics: Vec<crate::models::topic::CreateTopic>,
    #[serde(default)]
    pub participant_ids: Vec<DbId>,
}

fn default_true() -> bool {
    true
}
