#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use planpoker_api::auth::jwt::{sign_token, JwtConfig};
use planpoker_api::config::{LogFormat, ServerConfig};
use planpoker_api::router::build_app_router;
use planpoker_api::state::AppState;
use planpoker_core::roles::{ROLE_ADMIN, ROLE_USER};
use planpoker_core::types::DbId;
use planpoker_db::models::project::{CreateProject, Project};
use planpoker_db::models::user::{CreateUser, User};
use planpoker_db::repositories::{ProjectMemberRepo, ProjectRepo, UserRepo};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        ws_heartbeat_interval_secs: 30,
        log_format: LogFormat::Pretty,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            token_ttl_mins: 15,
            leeway_secs: 0,
        },
    }
}

pub fn build_test_state(pool: PgPool) -> AppState {
    AppState::new(pool, test_config())
}

/// Build the full application router, using the same middleware stack as
/// production.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = build_test_state(pool);
    build_app_router(state, &test_config())
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, name: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: format!("{name}@example.com"),
            name: name.to_string(),
            role: role.to_string(),
        },
    )
    .await
    .expect("create user")
}

pub async fn create_regular_user(pool: &PgPool, name: &str) -> User {
    create_user(pool, name, ROLE_USER).await
}

pub async fn create_admin(pool: &PgPool, name: &str) -> User {
    create_user(pool, name, ROLE_ADMIN).await
}

pub async fn create_project(pool: &PgPool, name: &str) -> Project {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .expect("create project")
}

pub async fn add_member(pool: &PgPool, project_id: DbId, user_id: DbId, role: &str) {
    ProjectMemberRepo::upsert(pool, project_id, user_id, role)
        .await
        .expect("add project member");
}

pub fn token_for(user: &User) -> String {
    sign_token(user.id, &test_config().jwt).expect("sign token")
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> axum::response::Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub fn assert_status(response: &axum::response::Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
