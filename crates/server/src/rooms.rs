use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::connection::ConnectionHandle;

#[derive(Debug, Clone)]
struct RoomMember {
    handle: ConnectionHandle,
    name: String,
}

/// WebRTC signaling rooms: `room_id` → members currently joined, keyed by
/// connection id. A room is created implicitly by the first `join` and
/// deleted once its last member leaves.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, HashMap<String, RoomMember>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn_id` to `room_id` under `name`. Returns the members already
    /// present, snapshotted under the same write-lock acquisition that
    /// performs the insert — so a concurrent join/leave can't be interleaved
    /// between "read the roster" and "add myself".
    pub async fn join(
        &self,
        room_id: &str,
        conn_id: &str,
        name: &str,
        handle: ConnectionHandle,
    ) -> Vec<(String, String)> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_default();
        let existing = room
            .iter()
            .map(|(id, m)| (id.clone(), m.name.clone()))
            .collect();
        room.insert(conn_id.to_string(), RoomMember {
            handle,
            name: name.to_string(),
        });
        existing
    }

    /// Remove `conn_id` from `room_id`, dropping the room once empty.
    /// Returns the members still present, to notify of the departure.
    pub async fn leave(&self, room_id: &str, conn_id: &str) -> Vec<ConnectionHandle> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Vec::new();
        };
        room.remove(conn_id);
        let remaining: Vec<ConnectionHandle> = room.values().map(|m| m.handle.clone()).collect();
        if room.is_empty() {
            rooms.remove(room_id);
        }
        remaining
    }

    pub async fn get_member(&self, room_id: &str, conn_id: &str) -> Option<ConnectionHandle> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .and_then(|room| room.get(conn_id))
            .map(|m| m.handle.clone())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn handle(conn_id: &str) -> (ConnectionHandle, mpsc::UnboundedReceiver<crate::connection::OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(conn_id.into(), tx), rx)
    }

    #[tokio::test]
    async fn join_returns_existing_members_only() {
        let rooms = RoomRegistry::new();
        let (h1, _rx1) = handle("a");
        let (h2, _rx2) = handle("b");

        let first = rooms.join("room1", "a", "alice", h1).await;
        assert!(first.is_empty());

        let second = rooms.join("room1", "b", "bob", h2).await;
        assert_eq!(second, vec![("a".to_string(), "alice".to_string())]);
    }

    #[tokio::test]
    async fn leave_drops_empty_room() {
        let rooms = RoomRegistry::new();
        let (h1, _rx1) = handle("a");
        rooms.join("room1", "a", "alice", h1).await;
        assert_eq!(rooms.room_count().await, 1);

        rooms.leave("room1", "a").await;
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn leave_notifies_remaining_members() {
        let rooms = RoomRegistry::new();
        let (h1, _rx1) = handle("a");
        let (h2, _rx2) = handle("b");
        rooms.join("room1", "a", "alice", h1).await;
        rooms.join("room1", "b", "bob", h2).await;

        let remaining = rooms.leave("room1", "a").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].conn_id, "b");
    }
}
