//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::protocol::{RoomId, ServerMessage};
use crate::registry::RoomRegistry;
use crate::snapshot::SnapshotGateway;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// 연결 식별자. 연결마다 새로 발급되며 재사용되지 않는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 단일 수신자에 대한 전달 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// 송신 큐가 가득 차서 버려짐
    Dropped,
    /// 수신 측이 이미 닫힘
    Closed,
}

/// 연결 세션 정보
pub struct ConnectionHandle {
    pub id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
    /// 참여한 방 목록 캐시. 권위 있는 정보는 `RoomRegistry`에 있다.
    pub rooms: DashSet<RoomId>,
    /// 전달된 캔버스 이벤트(프레임, clear) 수. 락은 적재와 함께 잡는다.
    canvas_events: Mutex<u64>,
    pub connected_at: Instant,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
            rooms: DashSet::new(),
            canvas_events: Mutex::new(0),
            connected_at: Instant::now(),
        }
    }

    /// 블로킹 없이 송신 큐에 적재
    pub fn deliver(&self, message: ServerMessage) -> Delivery {
        if !message.is_canvas_event() {
            return self.enqueue(message);
        }
        let mut seen = self.lock_canvas_events();
        let delivery = self.enqueue(message);
        if delivery == Delivery::Delivered {
            *seen += 1;
        }
        delivery
    }

    /// `expected` 이후로 캔버스 이벤트가 전달되지 않았을 때만 적재한다.
    /// 비교와 적재가 같은 락 안에서 일어나므로 그 사이에 끼어드는 이벤트가 없다.
    /// 이미 더 새로운 이벤트가 있었다면 `None`.
    pub fn deliver_if_unchanged(&self, message: ServerMessage, expected: u64) -> Option<Delivery> {
        let mut seen = self.lock_canvas_events();
        if *seen != expected {
            return None;
        }
        let delivery = self.enqueue(message);
        if delivery == Delivery::Delivered {
            *seen += 1;
        }
        Some(delivery)
    }

    /// 지금까지 이 연결로 전달된 캔버스 이벤트 수
    pub fn canvas_events(&self) -> u64 {
        *self.lock_canvas_events()
    }

    fn enqueue(&self, message: ServerMessage) -> Delivery {
        match self.sender.try_send(message) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    fn lock_canvas_events(&self) -> MutexGuard<'_, u64> {
        self.canvas_events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 애플리케이션 상태. 프로세스 전역이 아니라 서버 인스턴스마다 생성된다.
pub struct AppState {
    /// 방 멤버십 (room_id -> connection ids)
    pub rooms: RoomRegistry,
    /// 활성 연결 (connection_id -> ConnectionHandle)
    pub connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// 스냅샷 저장소
    pub snapshots: Arc<dyn SnapshotGateway>,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, snapshots: Arc<dyn SnapshotGateway>) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            connections: DashMap::new(),
            snapshots,
            config: Arc::new(config),
        }
    }

    /// 연결 핸들 조회. 맵 락을 잡고 있지 않도록 복제본을 돌려준다.
    pub fn connection(&self, id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&id).map(|entry| Arc::clone(entry.value()))
    }
}


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
