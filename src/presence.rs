//! 방 인원수 브로드캐스트
//!
//! 인원수는 캐시하지 않는다. 방의 락을 잡은 채로 현재 멤버 수를 읽고 그 자리에서
//! 모든 멤버에게 보내므로, 동시에 멤버십이 바뀌어도 수신자가 오래된 값을 나중에
//! 받는 일이 없다.

use crate::broadcast;
use crate::protocol::ServerMessage;
use crate::state::AppState;

/// 현재 인원수를 방의 모든 멤버에게 전송. 방이 없으면 `None`.
pub fn publish_count(state: &AppState, room_id: &str) -> Option<usize> {
    let mut count = 0;
    let delivered = broadcast::broadcast_to_all(state, room_id, |members| {
        count = members.len();
        ServerMessage::UpdateClientCount(count)
    })?;
    tracing::debug!(room_id = %room_id, count, delivered, "Client count published");
    Some(count)
}
