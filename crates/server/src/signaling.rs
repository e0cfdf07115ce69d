use parlor_common::ServerError;
use parlor_protocol::outbound::{RelayFrame, RoomPeer};

use crate::{connection::ConnectionHandle, rooms::RoomRegistry};

/// Join `room_id` under `name`: the roster existing at the moment of the
/// join is sent to the joiner alone as `user-list`, and only once that send
/// has been queued is the new member broadcast as `user-joined` to everyone
/// already there — the joiner's own reply always reaches it first.
pub async fn join_room(
    rooms: &RoomRegistry,
    room_id: &str,
    conn_id: &str,
    name: &str,
    handle: ConnectionHandle,
) {
    let existing = rooms.join(room_id, conn_id, name, handle.clone()).await;

    let user_list = RelayFrame::UserList {
        users: existing
            .iter()
            .map(|(id, name)| RoomPeer { id: id.clone(), name: name.clone() })
            .collect(),
    };
    if let Ok(json) = serde_json::to_string(&user_list) {
        handle.send(&json);
    }

    let joined = RelayFrame::UserJoined {
        user_id: conn_id.to_string(),
        name: name.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&joined) {
        for (other_id, _) in &existing {
            if let Some(member) = rooms.get_member(room_id, other_id).await {
                member.send(&json);
            }
        }
    }
}

/// Remove `conn_id` from `room_id`, notifying the remaining members.
/// No-op if the connection wasn't in the room.
pub async fn leave_room(rooms: &RoomRegistry, room_id: &str, conn_id: &str) {
    let remaining = rooms.leave(room_id, conn_id).await;
    let left = RelayFrame::UserLeft {
        user_id: conn_id.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&left) {
        for member in remaining {
            member.send(&json);
        }
    }
}

/// Relay an offer/answer/ice-candidate to `target_id` within `room_id`.
/// The recipient is told the *sender's* connection id so it knows who to
/// address its reply to.
pub async fn relay(
    rooms: &RoomRegistry,
    room_id: &str,
    target_id: &str,
    frame: RelayFrame,
) -> Result<(), ServerError> {
    let target = rooms
        .get_member(room_id, target_id)
        .await
        .ok_or(ServerError::TargetAbsent)?;
    let json = serde_json::to_string(&frame).map_err(|e| ServerError::Internal(e.to_string()))?;
    target.send(&json);
    Ok(())
}
