//! End-to-end tests for the WebSocket endpoint over a real listener.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use planpoker_core::planning::SessionStatus;
use planpoker_core::roles::PROJECT_ROLE_PRODUCT_OWNER;
use planpoker_core::types::DbId;
use planpoker_db::models::planning_session::{CreatePlanningSession, PlanningSession};
use planpoker_db::repositories::PlanningSessionRepo;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the app on an ephemeral port and return its address.
async fn spawn_server(pool: PgPool) -> std::net::SocketAddr {
    let app = common::build_test_app(pool);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: std::net::SocketAddr, token: &str) -> Client {
    let url = format!("ws://{addr}/api/v1/ws?token={token}");
    let (socket, _) = connect_async(url).await.expect("websocket handshake");
    socket
}

async fn send(client: &mut Client, event: Value) {
    client
        .send(Message::Text(event.to_string()))
        .await
        .unwrap();
}

/// Next JSON text frame, skipping control frames.
async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn active_session(pool: &PgPool, created_by: DbId, project_id: DbId) -> PlanningSession {
    PlanningSessionRepo::create(
        pool,
        &CreatePlanningSession {
            title: "Sprint 12".to_string(),
            project_id,
            created_by,
            room_code: "WSROOM".to_string(),
            metrics: None,
            status_id: SessionStatus::Active.id(),
            allow_chat: true,
            allow_emoticons: true,
            notify_email: false,
            scheduled_at: None,
        },
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test: upgrade without a token is rejected before the handshake
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_without_token_returns_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let request = Request::builder()
        .uri("/api/v1/ws")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upgrade_with_garbage_token_is_refused(pool: PgPool) {
    let addr = spawn_server(pool).await;

    let result = connect_async(format!("ws://{addr}/api/v1/ws?token=garbage")).await;

    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Test: join, announce, chat and disconnect over real sockets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn two_clients_join_chat_and_leave(pool: PgPool) {
    let owner = common::create_regular_user(&pool, "owner").await;
    let dev = common::create_regular_user(&pool, "dev").await;
    let project = common::create_project(&pool, "Storefront").await;
    common::add_member(&pool, project.id, owner.id, PROJECT_ROLE_PRODUCT_OWNER).await;
    let session = active_session(&pool, owner.id, project.id).await;

    let addr = spawn_server(pool.clone()).await;
    let mut a = connect(addr, &common::token_for(&owner)).await;
    let mut b = connect(addr, &common::token_for(&dev)).await;

    send(&mut a, json!({ "type": "join-room", "roomCode": "wsroom" })).await;
    let joined = next_event(&mut a).await;
    assert_eq!(joined["type"], "room-joined");
    assert_eq!(joined["session"]["id"], session.id);
    assert_eq!(joined["user"]["id"], owner.id);

    send(&mut b, json!({ "type": "join-room", "sessionId": session.id })).await;
    let joined = next_event(&mut b).await;
    assert_eq!(joined["type"], "room-joined");
    assert_eq!(joined["state"]["participants"].as_array().unwrap().len(), 2);

    let announced = next_event(&mut a).await;
    assert_eq!(announced["type"], "user-joined");
    assert_eq!(announced["user"]["id"], dev.id);

    send(&mut b, json!({ "type": "send-message", "message": "hi all" })).await;
    for client in [&mut a, &mut b] {
        let message = next_event(client).await;
        assert_eq!(message["type"], "new-message");
        assert_eq!(message["message"], "hi all");
    }

    b.close(None).await.unwrap();
    let left = next_event(&mut a).await;
    assert_eq!(left["type"], "user-left");
    assert_eq!(left["user"]["id"], dev.id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn binary_frames_get_an_error_event(pool: PgPool) {
    let user = common::create_regular_user(&pool, "someone").await;
    let addr = spawn_server(pool).await;
    let mut client = connect(addr, &common::token_for(&user)).await;

    client
        .send(Message::Binary(vec![1, 2, 3]))
        .await
        .unwrap();

    let event = next_event(&mut client).await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["code"], "INVALID_REQUEST");
}
