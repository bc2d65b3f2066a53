//! 연결 핸들러

use crate::broadcast;
use crate::presence;
use crate::protocol::ServerMessage;
use crate::state::{AppState, ConnectionHandle};
use std::sync::Arc;
use tokio::sync::mpsc;

/// 새 연결 처리
pub fn handle_connection(
    state: &AppState,
    sender: mpsc::Sender<ServerMessage>,
) -> Arc<ConnectionHandle> {
    let conn = Arc::new(ConnectionHandle::new(sender));
    state.connections.insert(conn.id, Arc::clone(&conn));

    conn.deliver(ServerMessage::Connected { socket_id: conn.id });

    tracing::info!(conn_id = %conn.id, "New connection established");
    conn
}

/// 연결 해제 처리. 참여했던 모든 방에서 제거하고 남은 멤버에게 인원수를 알린다.
/// 여러 번 호출해도 안전하다.
pub fn handle_disconnect(state: &AppState, conn: &ConnectionHandle) {
    state.connections.remove(&conn.id);

    let touched = state.rooms.remove_connection_everywhere(conn.id);
    conn.rooms.clear();

    for (room_id, remaining) in &touched {
        if *remaining == 0 {
            tracing::info!(room_id = %room_id, "Room deleted");
            continue;
        }
        presence::publish_count(state, room_id);
    }

    tracing::info!(
        conn_id = %conn.id,
        rooms = touched.len(),
        connected_for_ms = conn.connected_at.elapsed().as_millis() as u64,
        "Connection closed"
    );
}

/// Heartbeat 처리
pub fn handle_heartbeat(state: &AppState, conn: &ConnectionHandle) {
    broadcast::send_to(state, conn.id, ServerMessage::HeartbeatAck);
}
