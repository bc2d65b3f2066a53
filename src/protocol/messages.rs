//! 클라이언트-서버 메시지 프로토콜 정의

use crate::state::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// 방 식별자 (대소문자 구분, 정확히 일치해야 같은 방)
pub type RoomId = String;

/// 드로잉 페이로드. 서버는 내용을 해석하지 않고 그대로 중계한다.
pub type DrawingPayload = Arc<Value>;

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    // Connection
    Heartbeat,

    // Room Management
    JoinDrawing { drawing_id: RoomId },
    LeaveDrawing { drawing_id: RoomId },

    // Drawing
    SendDrawingData { drawing_id: RoomId, data: Value },
    /// 페이로드는 방 ID 문자열 그대로
    ClearCanvas(RoomId),
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Connection
    Connected { socket_id: ConnectionId },
    HeartbeatAck,
    Error { code: String, message: String },

    // Drawing
    ReceiveDrawingData(DrawingPayload),
    ClearCanvas,

    // Presence
    UpdateClientCount(usize),
}

impl ServerMessage {
    /// 참여자의 캔버스 내용을 바꾸는 이벤트
    pub fn is_canvas_event(&self) -> bool {
        matches!(self, Self::ReceiveDrawingData(_) | Self::ClearCanvas)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
