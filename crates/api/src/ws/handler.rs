use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::middleware::auth::{AuthUser, WsAuthUser};
use crate::poker::{RealtimeError, ServerEvent, SessionCoordinator};
use crate::state::AppState;

/// HTTP handler that upgrades an authenticated connection to WebSocket.
///
/// Authentication runs before the upgrade, so a missing, invalid or expired
/// token (or an inactive user) is answered with 401 and no socket is opened.
pub async fn ws_handler(
    WsAuthUser(user): WsAuthUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound frames in arrival order on the current task.
///   4. Leaves the room and forgets the connection on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = user.user_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone(), user.summary()).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    receive_loop(&mut stream, &conn_id, &state.coordinator).await;

    state.coordinator.disconnect(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

async fn receive_loop(
    stream: &mut futures::stream::SplitStream<WebSocket>,
    conn_id: &str,
    coordinator: &Arc<SessionCoordinator>,
) {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                coordinator.handle_frame(conn_id, text.as_str()).await;
            }
            Ok(Message::Binary(_)) => {
                let err = RealtimeError::InvalidRequest("Binary frames are not supported".into());
                coordinator.reply(conn_id, &ServerEvent::error(&err)).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Ping(_)) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }
}
