//! 방 브로드캐스트
//!
//! 나머지 모듈은 `broadcast_to_others` / `broadcast_to_all` 두 가지
//! fan-out만 사용한다. 수신자마다 제한된 송신 큐에 `try_send`로 적재하므로
//! 느린 수신자가 다른 수신자나 송신자를 막지 않는다. 큐가 가득 찬 수신자는
//! 해당 메시지를 잃고, 닫힌 수신자는 건너뛴다 (정리는 disconnect 경로에서).

use crate::protocol::ServerMessage;
use crate::state::{AppState, ConnectionId, Delivery};
use std::collections::HashSet;

/// 보낸 사람을 제외한 방의 모든 멤버에게 전송. 전달된 수를 반환한다.
pub fn broadcast_to_others(
    state: &AppState,
    room_id: &str,
    sender_id: ConnectionId,
    message: ServerMessage,
) -> usize {
    state
        .rooms
        .with_members(room_id, |members| {
            fan_out(
                state,
                room_id,
                members.iter().filter(|id| **id != sender_id),
                &message,
            )
        })
        .unwrap_or(0)
}

/// 방의 모든 멤버에게 전송. 메시지는 방의 락을 잡은 채로 현재 멤버 집합에서
/// 만든다. 방이 없으면 `None`, 있으면 전달된 수.
pub fn broadcast_to_all(
    state: &AppState,
    room_id: &str,
    build: impl FnOnce(&HashSet<ConnectionId>) -> ServerMessage,
) -> Option<usize> {
    state.rooms.with_members(room_id, |members| {
        let message = build(members);
        fan_out(state, room_id, members.iter(), &message)
    })
}

/// 특정 연결에게 직접 전송
pub fn send_to(state: &AppState, conn_id: ConnectionId, message: ServerMessage) -> bool {
    match state.connection(conn_id) {
        Some(conn) => conn.deliver(message) == Delivery::Delivered,
        None => false,
    }
}

/// 주어진 수신자 목록으로 전송. 수신자별 실패는 서로 격리된다.
fn fan_out<'a>(
    state: &AppState,
    room_id: &str,
    recipients: impl Iterator<Item = &'a ConnectionId>,
    message: &ServerMessage,
) -> usize {
    let mut delivered = 0;
    for conn_id in recipients {
        let Some(conn) = state.connections.get(conn_id) else {
            tracing::debug!(conn_id = %conn_id, room_id = %room_id, "Recipient already gone");
            continue;
        };
        match conn.deliver(message.clone()) {
            Delivery::Delivered => delivered += 1,
            Delivery::Dropped => {
                tracing::warn!(
                    conn_id = %conn_id,
                    room_id = %room_id,
                    "Outbound queue full, message dropped"
                );
            }
            Delivery::Closed => {
                tracing::debug!(conn_id = %conn_id, room_id = %room_id, "Recipient channel closed");
            }
        }
    }
    delivered
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
