//! 방 관리 핸들러

use crate::presence;
use crate::protocol::ServerMessage;
use crate::registry::Departure;
use crate::state::{AppState, ConnectionHandle};
use std::sync::Arc;

/// 방 참여 실패 사유
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("drawing id must not be empty")]
    InvalidRoom,

    #[error("connection already joined {limit} drawings")]
    TooManyRooms { limit: usize },
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRoom => "INVALID_ROOM",
            Self::TooManyRooms { .. } => "TOO_MANY_ROOMS",
        }
    }
}

/// 방 참여 처리
///
/// 멤버십 등록 → 스냅샷 조회 후 참여자에게만 전달 → 방 전체에 인원수 전송.
/// 스냅샷 조회는 이 연결의 태스크에서만 대기하므로 다른 연결에 영향이 없다.
pub async fn handle_join_room(
    state: &AppState,
    conn: &ConnectionHandle,
    room_id: &str,
) -> Result<usize, JoinError> {
    if room_id.is_empty() {
        return Err(JoinError::InvalidRoom);
    }

    let rejoin = state.rooms.contains(room_id, conn.id);
    let limit = state.config.room.max_rooms_per_connection;
    if !rejoin && conn.rooms.len() >= limit {
        tracing::warn!(conn_id = %conn.id, room_id = %room_id, limit, "Room limit reached, rejected join");
        return Err(JoinError::TooManyRooms { limit });
    }

    let count = state.rooms.join(room_id, conn.id);
    conn.rooms.insert(room_id.to_string());
    tracing::info!(conn_id = %conn.id, room_id = %room_id, count, rejoin, "Joined room");

    if !rejoin {
        deliver_snapshot(state, conn, room_id).await;
    }

    presence::publish_count(state, room_id);
    Ok(count)
}

/// 저장된 스냅샷을 참여자에게만 전달. 조회 중에 이미 실시간 프레임이나 clear를
/// 받았다면 스냅샷이 더 오래된 상태이므로 버린다.
async fn deliver_snapshot(state: &AppState, conn: &ConnectionHandle, room_id: &str) {
    let events_before = conn.canvas_events();

    match state.snapshots.fetch(room_id).await {
        Ok(Some(snapshot)) => {
            let message = ServerMessage::ReceiveDrawingData(Arc::new(snapshot));
            match conn.deliver_if_unchanged(message, events_before) {
                Some(delivery) => {
                    tracing::debug!(conn_id = %conn.id, room_id = %room_id, ?delivery, "Snapshot sent");
                }
                None => {
                    tracing::debug!(conn_id = %conn.id, room_id = %room_id, "Snapshot superseded by live event");
                }
            }
        }
        Ok(None) => {
            tracing::debug!(room_id = %room_id, "No snapshot stored, starting blank");
        }
        Err(e) => {
            tracing::warn!(room_id = %room_id, error = %e, "Snapshot fetch failed, starting blank");
        }
    }
}

/// 방 나가기 처리. 멤버가 아니었다면 아무 일도 일어나지 않는다.
pub fn handle_leave_room(state: &AppState, conn: &ConnectionHandle, room_id: &str) -> Departure {
    let departure = state.rooms.leave(room_id, conn.id);
    conn.rooms.remove(room_id);

    match departure {
        Departure::Remaining(remaining) => {
            presence::publish_count(state, room_id);
            tracing::info!(conn_id = %conn.id, room_id = %room_id, remaining, "Left room");
        }
        Departure::Emptied => {
            tracing::info!(conn_id = %conn.id, room_id = %room_id, "Left room, room deleted");
        }
        Departure::NotMember => {
            tracing::debug!(conn_id = %conn.id, room_id = %room_id, "Leave ignored, not a member");
        }
    }

    departure
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
