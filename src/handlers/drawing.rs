//! 드로잉 중계 핸들러

use crate::broadcast::broadcast_to_others;
use crate::protocol::ServerMessage;
use crate::state::{AppState, ConnectionHandle};
use serde_json::Value;
use std::sync::Arc;

/// 드로잉 프레임 중계. 페이로드는 검사하거나 변환하지 않는다.
pub fn handle_drawing_data(
    state: &AppState,
    conn: &ConnectionHandle,
    room_id: &str,
    data: Value,
) -> usize {
    if !state.rooms.contains(room_id, conn.id) {
        tracing::debug!(conn_id = %conn.id, room_id = %room_id, "Frame from non-member dropped");
        return 0;
    }

    let delivered = broadcast_to_others(
        state,
        room_id,
        conn.id,
        ServerMessage::ReceiveDrawingData(Arc::new(data)),
    );

    tracing::debug!(
        from = %conn.id,
        room_id = %room_id,
        delivered,
        "Relayed drawing data"
    );
    delivered
}

/// 캔버스 초기화 신호 중계. 보낸 쪽은 이미 로컬에서 지웠으므로 제외한다.
pub fn handle_clear_canvas(state: &AppState, conn: &ConnectionHandle, room_id: &str) -> usize {
    if !state.rooms.contains(room_id, conn.id) {
        tracing::debug!(conn_id = %conn.id, room_id = %room_id, "Clear from non-member dropped");
        return 0;
    }

    let delivered = broadcast_to_others(state, room_id, conn.id, ServerMessage::ClearCanvas);

    tracing::info!(from = %conn.id, room_id = %room_id, delivered, "Relayed clear");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::handle_disconnect;
    use crate::state::test_helpers::{assert_silent, connect, recv, test_app_state};
    use serde_json::json;

    #[tokio::test]
    async fn frame_reaches_others_but_not_sender() {
        let state = test_app_state();
        let (a, mut rx_a) = connect(&state, 8).await;
        let (b, mut rx_b) = connect(&state, 8).await;
        let (c, mut rx_c) = connect(&state, 8).await;
        for id in [a.id, b.id, c.id] {
            state.rooms.join("abc", id);
        }

        let data = json!("data:image/png;base64,F1");
        assert_eq!(handle_drawing_data(&state, &a, "abc", data.clone()), 2);

        let expected = ServerMessage::ReceiveDrawingData(Arc::new(data));
        assert_eq!(recv(&mut rx_b).await, expected);
        assert_eq!(recv(&mut rx_c).await, expected);
        assert_silent(&mut rx_a).await;
    }

    #[tokio::test]
    async fn payload_is_relayed_unchanged() {
        let state = test_app_state();
        let (a, _rx_a) = connect(&state, 8).await;
        let (b, mut rx_b) = connect(&state, 8).await;
        state.rooms.join("abc", a.id);
        state.rooms.join("abc", b.id);

        let data = json!({"opaque": [1, 2, {"nested": null}], "w": 640});
        handle_drawing_data(&state, &a, "abc", data.clone());

        match recv(&mut rx_b).await {
            ServerMessage::ReceiveDrawingData(got) => assert_eq!(*got, data),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clear_reaches_others_but_not_sender() {
        let state = test_app_state();
        let (a, mut rx_a) = connect(&state, 8).await;
        let (b, mut rx_b) = connect(&state, 8).await;
        state.rooms.join("abc", a.id);
        state.rooms.join("abc", b.id);

        assert_eq!(handle_clear_canvas(&state, &a, "abc"), 1);
        assert_eq!(recv(&mut rx_b).await, ServerMessage::ClearCanvas);
        assert_silent(&mut rx_a).await;
        assert_eq!(state.rooms.member_count("abc"), 2);
    }

    #[tokio::test]
    async fn non_member_events_are_dropped() {
        let state = test_app_state();
        let (a, mut rx_a) = connect(&state, 8).await;
        let (outsider, _rx_o) = connect(&state, 8).await;
        state.rooms.join("abc", a.id);

        assert_eq!(handle_drawing_data(&state, &outsider, "abc", json!("x")), 0);
        assert_eq!(handle_clear_canvas(&state, &outsider, "abc"), 0);
        assert_silent(&mut rx_a).await;
    }

    #[tokio::test]
    async fn nothing_is_relayed_from_disconnected_connection() {
        let state = test_app_state();
        let (a, mut rx_a) = connect(&state, 8).await;
        let (gone, _rx_gone) = connect(&state, 8).await;
        state.rooms.join("abc", a.id);
        state.rooms.join("abc", gone.id);

        handle_disconnect(&state, &gone);
        assert_eq!(recv(&mut rx_a).await, ServerMessage::UpdateClientCount(1));

        assert_eq!(handle_drawing_data(&state, &gone, "abc", json!("late")), 0);
        assert_eq!(handle_clear_canvas(&state, &gone, "abc"), 0);
        assert_silent(&mut rx_a).await;
    }
}
