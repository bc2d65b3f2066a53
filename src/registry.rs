//! 방 멤버십 레지스트리
//!
//! 방 ID별 멤버 집합의 유일한 권위 있는 저장소. 모든 변경은 해당 키의
//! 샤드 락 안에서 일어나므로 같은 방에 대한 join/leave는 서로 선형화되고,
//! 서로 다른 방은 전역 락을 공유하지 않는다. 멤버가 0명이 된 방은 같은
//! 락 안에서 제거된다.

use crate::protocol::RoomId;
use crate::state::ConnectionId;
use dashmap::DashMap;
use std::collections::HashSet;

/// `leave` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// 멤버가 아니었음 (방이 없던 경우 포함)
    NotMember,
    /// 남은 멤버 수
    Remaining(usize),
    /// 마지막 멤버가 나가 방이 삭제됨
    Emptied,
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 방 참여 (없으면 생성). 새 멤버 수를 반환한다.
    pub fn join(&self, room_id: &str, conn_id: ConnectionId) -> usize {
        let mut members = self.rooms.entry(room_id.to_string()).or_default();
        members.insert(conn_id);
        members.len()
    }

    /// 방 나가기. 멤버가 아니면 아무것도 하지 않는다.
    pub fn leave(&self, room_id: &str, conn_id: ConnectionId) -> Departure {
        let mut departure = Departure::NotMember;
        self.rooms.remove_if_mut(room_id, |_, members| {
            if members.remove(&conn_id) {
                departure = if members.is_empty() {
                    Departure::Emptied
                } else {
                    Departure::Remaining(members.len())
                };
            }
            members.is_empty()
        });
        departure
    }

    /// 모든 방에서 연결을 제거하고, 실제로 변경된 방과 남은 멤버 수를 반환한다.
    pub fn remove_connection_everywhere(&self, conn_id: ConnectionId) -> Vec<(RoomId, usize)> {
        let mut touched = Vec::new();
        self.rooms.retain(|room_id, members| {
            if members.remove(&conn_id) {
                touched.push((room_id.clone(), members.len()));
            }
            !members.is_empty()
        });
        touched
    }

    /// 방의 락을 잡은 상태에서 현재 멤버 집합으로 `f`를 실행한다.
    /// `f` 안에서 레지스트리를 다시 호출하면 안 된다.
    pub fn with_members<R>(
        &self,
        room_id: &str,
        f: impl FnOnce(&HashSet<ConnectionId>) -> R,
    ) -> Option<R> {
        self.rooms.get(room_id).map(|members| f(members.value()))
    }

    #[cfg(test)]
    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |members| members.len())
    }

    pub fn contains(&self, room_id: &str, conn_id: ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(&conn_id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
