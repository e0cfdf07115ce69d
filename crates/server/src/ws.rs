use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, stream::StreamExt};
use parlor_protocol::outbound::error_envelope;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    connection::{ConnectionHandle, ConnectionState, OutboundFrame},
    router::{self, Outcome},
    signaling,
    state::SharedState,
};

/// Handle a single WebSocket connection through its full lifecycle: register
/// the write loop, run the message loop, clean up on disconnect.
pub async fn handle_connection(socket: WebSocket, state: SharedState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "ws: new connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();

    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(msg) => {
                    if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                        debug!(conn_id = %write_conn_id, "ws: write loop closed");
                        break;
                    }
                },
                OutboundFrame::Close => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    debug!(conn_id = %write_conn_id, "ws: closed by eviction");
                    break;
                },
            }
        }
    });

    let conn = ConnectionHandle::new(conn_id.clone(), tx);
    let mut conn_state = ConnectionState::Connected;
    let mut current_room: Option<String> = None;

    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "ws: read error");
                break;
            },
        };

        let result = match parlor_protocol::decode(&text) {
            Ok(decoded) => {
                router::dispatch(&state, &conn, &mut conn_state, &mut current_room, decoded).await
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(Outcome::Reply(envelope)) => {
                if let Ok(json) = serde_json::to_string(&envelope) {
                    conn.send(&json);
                }
            },
            Ok(Outcome::Handled) => {},
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "ws: handler error");
                let envelope = error_envelope(&e);
                if let Ok(json) = serde_json::to_string(&envelope) {
                    conn.send(&json);
                }
            },
        }
    }

    cleanup(&state, &conn, &conn_state, current_room).await;
    write_handle.abort();
}

async fn cleanup(
    state: &SharedState,
    conn: &ConnectionHandle,
    conn_state: &ConnectionState,
    current_room: Option<String>,
) {
    if let Some(user_id) = conn_state.user_id() {
        state.sessions.remove_if_current(user_id, &conn.conn_id).await;
    }
    if let Some(room_id) = current_room {
        signaling::leave_room(&state.rooms, &room_id, &conn.conn_id).await;
    }
    info!(conn_id = %conn.conn_id, "ws: connection closed");
}
