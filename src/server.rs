//! HTTP/WebSocket 서버
//!
//! 연결마다 수신 루프 하나와 송신 태스크 하나가 돈다. 수신 이벤트는 연결
//! 단위로 순서대로 처리되므로 한 참여자가 보낸 프레임의 순서가 모든 수신자에게
//! 그대로 유지된다. 소켓 종료, 오류, 송신 실패는 모두 disconnect 처리로 이어진다.

use crate::handlers;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, ConnectionHandle};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderValue,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 라우터 구성
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `shutdown`이 완료될 때까지 서버 실행
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>SketchSync Relay</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "sketchsync-relay",
        "rooms": state.rooms.room_count(),
        "connections": state.connections.len(),
        "timestamp": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.max_message_size(state.config.connection.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.connection.outbound_buffer);

    // 연결 처리
    let conn = handlers::handle_connection(&state, tx);
    let conn_id = conn.id;

    // 송신 태스크
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(conn_id = %conn_id, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // 수신 처리
    loop {
        tokio::select! {
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_client_message(&state, &conn, msg).await,
                    Err(e) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed message");
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = &mut send_task => {
                tracing::debug!(conn_id = %conn_id, "WebSocket write side closed");
                break;
            }
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, &conn);
    send_task.abort();
}

async fn handle_client_message(state: &AppState, conn: &ConnectionHandle, msg: ClientMessage) {
    match msg {
        ClientMessage::Heartbeat => {
            handlers::handle_heartbeat(state, conn);
        }
        ClientMessage::JoinDrawing { drawing_id } => {
            if let Err(e) = handlers::handle_join_room(state, conn, &drawing_id).await {
                conn.deliver(ServerMessage::error(e.code(), e.to_string()));
            }
        }
        ClientMessage::LeaveDrawing { drawing_id } => {
            handlers::handle_leave_room(state, conn, &drawing_id);
        }
        ClientMessage::SendDrawingData { drawing_id, data } => {
            handlers::handle_drawing_data(state, conn, &drawing_id, data);
        }
        ClientMessage::ClearCanvas(drawing_id) => {
            handlers::handle_clear_canvas(state, conn, &drawing_id);
        }
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
