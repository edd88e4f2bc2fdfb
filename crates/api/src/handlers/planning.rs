//! Handlers for the planning session lifecycle.
//!
//! Creation, lookup and start/end transitions. Everything that happens
//! inside a running session goes through the WebSocket coordinator instead.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use planpoker_core::error::CoreError;
use planpoker_core::planning::{
    validate_metrics, validate_title, validate_topic_title, SessionStatus,
};
use planpoker_core::roles::MANAGING_ROLES;
use planpoker_core::room_code::{generate_room_code, normalize_room_code, MAX_ROOM_CODE_ATTEMPTS};
use planpoker_core::types::DbId;
use planpoker_db::models::participant::ParticipantInfo;
use planpoker_db::models::planning_session::{
    CreatePlanningSession, CreatePlanningSessionRequest, PlanningSession,
};
use planpoker_db::models::topic::{CreateTopic, Topic};
use planpoker_db::models::vote::VoteInfo;
use planpoker_db::models::voting_round::VotingRound;
use planpoker_db::repositories::{
    ParticipantRepo, PlanningSessionRepo, ProjectMemberRepo, ProjectRepo, TopicRepo, UserRepo,
    VoteRepo, VotingRoundRepo,
};
use planpoker_db::store::constraints;
use planpoker_db::StoreError;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::poker::events::SessionView;
use crate::response::DataResponse;
use crate::state::AppState;

/// Session with its participants and topics.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionView,
    pub participants: Vec<ParticipantInfo>,
    pub topics: Vec<Topic>,
}

/// Active round of a topic with its votes.
#[derive(Debug, Serialize)]
pub struct TopicVotes {
    pub topic: Topic,
    pub active_round: Option<VotingRound>,
    pub votes: Vec<VoteInfo>,
    pub participants: Vec<ParticipantInfo>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_session(state: &AppState, id: DbId) -> AppResult<PlanningSession> {
    PlanningSessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "planning_session",
            id,
        }))
}

async fn load_detail(state: &AppState, session: PlanningSession) -> AppResult<SessionDetail> {
    let participants = ParticipantRepo::list_for_session(&state.pool, session.id).await?;
    let topics = TopicRepo::list_for_session(&state.pool, session.id).await?;
    Ok(SessionDetail {
        session: session.into(),
        participants,
        topics,
    })
}

/// Admins, product owners and product managers of the project may manage
/// its sessions.
async fn require_manager(state: &AppState, auth: &AuthUser, project_id: DbId) -> AppResult<()> {
    if auth.is_admin()
        || ProjectMemberRepo::has_role(&state.pool, project_id, auth.user_id, MANAGING_ROLES)
            .await?
    {
        return Ok(());
    }
    Err(AppError::Core(CoreError::Forbidden(
        "Only the product owner or product manager can manage planning sessions".into(),
    )))
}

/// Insert the session with its topics and participants under a fresh room
/// code, retrying on collisions. A collision rolls back the whole attempt.
async fn insert_with_room_code(
    state: &AppState,
    mut input: CreatePlanningSession,
    topics: &[CreateTopic],
    participant_ids: &[DbId],
) -> AppResult<PlanningSession> {
    for attempt in 1..=MAX_ROOM_CODE_ATTEMPTS {
        let code = generate_room_code();
        if PlanningSessionRepo::room_code_exists(&state.pool, &code).await? {
            continue;
        }
        input.room_code = code;
        match PlanningSessionRepo::create_with_members(&state.pool, &input, topics, participant_ids)
            .await
        {
            Ok(session) => return Ok(session),
            Err(e) => {
                let err = StoreError::from(e);
                if !err.is_conflict_on(constraints::ROOM_CODE) {
                    return Err(err.into());
                }
                tracing::debug!(attempt, "Room code collided on insert, retrying");
            }
        }
    }
    Err(AppError::InternalError(
        "Could not allocate a unique room code".into(),
    ))
}

async fn transition(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
    next: SessionStatus,
) -> AppResult<PlanningSession> {
    let session = load_session(state, id).await?;
    require_manager(state, auth, session.project_id).await?;

    let from: Vec<SessionStatus> = [
        SessionStatus::Draft,
        SessionStatus::Scheduled,
        SessionStatus::Active,
        SessionStatus::Completed,
    ]
    .into_iter()
    .filter(|s| s.can_transition_to(next))
    .collect();

    match PlanningSessionRepo::transition(&state.pool, id, &from, next).await? {
        Some(updated) => {
            tracing::info!(
                session_id = id,
                user_id = auth.user_id,
                status = next.as_str(),
                "Planning session transitioned"
            );
            Ok(updated)
        }
        None => {
            let current = load_session(state, id).await?.status();
            Err(AppError::Core(CoreError::Conflict(format!(
                "Cannot move session from {} to {}",
                current.as_str(),
                next.as_str()
            ))))
        }
    }
}

// ---------------------------------------------------------------------------
// Session Endpoints
// ---------------------------------------------------------------------------

/// POST /api/v1/planning-sessions
///
/// Create a session with an optional initial topic list and invitees. The
/// creator is added as a participant.
pub async fn create_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePlanningSessionRequest>,
) -> AppResult<impl IntoResponse> {
    validate_title(&input.title).map_err(AppError::BadRequest)?;
    validate_metrics(input.metrics.as_deref()).map_err(AppError::BadRequest)?;
    for topic in &input.topics {
        validate_topic_title(&topic.title).map_err(AppError::BadRequest)?;
    }

    ProjectRepo::find_by_id(&state.pool, input.project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "project",
            id: input.project_id,
        }))?;
    require_manager(&state, &auth, input.project_id).await?;

    for user_id in &input.participant_ids {
        if UserRepo::find_by_id(&state.pool, *user_id).await?.is_none() {
            return Err(AppError::BadRequest(format!("Unknown participant id {user_id}")));
        }
    }

    let mut participant_ids = vec![auth.user_id];
    participant_ids.extend(input.participant_ids.iter().copied());

    let status = SessionStatus::initial(input.scheduled_at.is_some());
    let session = insert_with_room_code(
        &state,
        CreatePlanningSession {
            title: input.title.trim().to_string(),
            project_id: input.project_id,
            created_by: auth.user_id,
            room_code: String::new(),
            metrics: input.metrics.clone(),
            status_id: status.id(),
            allow_chat: input.allow_chat,
            allow_emoticons: input.allow_emoticons,
            notify_email: input.notify_email,
            scheduled_at: input.scheduled_at,
        },
        &input.topics,
        &participant_ids,
    )
    .await?;

    tracing::info!(
        session_id = session.id,
        project_id = session.project_id,
        room_code = %session.room_code,
        user_id = auth.user_id,
        "Planning session created"
    );

    let detail = load_detail(&state, session).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/planning-sessions/{id}
pub async fn get_session(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = load_session(&state, id).await?;
    let detail = load_detail(&state, session).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/planning-sessions/by-code/{room_code}
///
/// Room codes are matched case-insensitively.
pub async fn get_session_by_code(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(room_code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let code = normalize_room_code(&room_code)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid room code: {room_code}")))?;
    let session = PlanningSessionRepo::find_by_room_code(&state.pool, &code)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "planning_session",
                field: "room_code",
                value: code.clone(),
            })
        })?;
    let detail = load_detail(&state, session).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/planning-sessions/{id}/start
pub async fn start_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = transition(&state, &auth, id, SessionStatus::Active).await?;
    Ok(Json(DataResponse {
        data: SessionView::from(session),
    }))
}

/// POST /api/v1/planning-sessions/{id}/end
///
/// Completed sessions can no longer be joined.
pub async fn end_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = transition(&state, &auth, id, SessionStatus::Completed).await?;
    Ok(Json(DataResponse {
        data: SessionView::from(session),
    }))
}

// ---------------------------------------------------------------------------
// Vote Endpoints
// ---------------------------------------------------------------------------

/// GET /api/v1/planning-sessions/{id}/topics/{topic_id}/votes
pub async fn get_topic_votes(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((id, topic_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let session = load_session(&state, id).await?;
    let topic = TopicRepo::find_by_id(&state.pool, topic_id)
        .await?
        .filter(|t| t.session_id == session.id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "topic",
            id: topic_id,
        }))?;

    let active_round = VotingRoundRepo::find_active_for_topic(&state.pool, topic.id).await?;
    let votes = match &active_round {
        Some(round) => VoteRepo::list_for_round(&state.pool, round.id).await?,
        None => Vec::new(),
    };
    let participants = ParticipantRepo::list_for_session(&state.pool, session.id).await?;

    Ok(Json(DataResponse {
        data: TopicVotes {
            topic,
            active_round,
            votes,
            participants,
        },
    }))
}
