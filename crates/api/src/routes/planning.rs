//! Route definitions for planning sessions.
//!
//! All endpoints require authentication via `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::planning;
use crate::state::AppState;

/// Planning session routes mounted at `/planning-sessions`.
///
/// ```text
/// POST /                                  -> create_session
/// GET  /{id}                              -> get_session
/// GET  /by-code/{room_code}               -> get_session_by_code
/// POST /{id}/start                        -> start_session
/// POST /{id}/end                          -> end_session
/// GET  /{id}/topics/{topic_id}/votes      -> get_topic_votes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(planning::create_session))
        .route("/{id}", get(planning::get_session))
        .route("/by-code/{room_code}", get(planning::get_session_by_code))
        .route("/{id}/start", post(planning::start_session))
        .route("/{id}/end", post(planning::end_session))
        .route(
            "/{id}/topics/{topic_id}/votes",
            get(planning::get_topic_votes),
        )
}
