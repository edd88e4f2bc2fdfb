pub mod health;
pub mod planning;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                              WebSocket (token required)
///
/// /planning-sessions                               create
/// /planning-sessions/{id}                          get
/// /planning-sessions/by-code/{room_code}           resolve room code
/// /planning-sessions/{id}/start                    start (POST)
/// /planning-sessions/{id}/end                      end (POST)
/// /planning-sessions/{id}/topics/{topic_id}/votes  active round votes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/planning-sessions", planning::router())
}
