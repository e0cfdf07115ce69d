use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::connection::ConnectionHandle;

/// Outcome of [`SessionRegistry::register`].
pub enum Registered {
    Fresh,
    /// A prior connection for this user existed and was evicted — the
    /// caller is expected to notify it: the newer login wins, the older
    /// connection is told it's been replaced.
    Evicted(ConnectionHandle),
}

/// Maps authorized users to their live connection. Only one connection per
/// user is tracked at a time.
#[derive(Default)]
pub struct SessionRegistry {
    by_user: RwLock<HashMap<i64, ConnectionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: i64, handle: ConnectionHandle) -> Registered {
        match self.by_user.write().await.insert(user_id, handle) {
            Some(old) => Registered::Evicted(old),
            None => Registered::Fresh,
        }
    }

    /// Remove `user_id`'s entry only if it still points at `conn_id`. Guards
    /// against a connection that just got evicted by a newer login removing
    /// the newer login's entry during its own cleanup.
    pub async fn remove_if_current(&self, user_id: i64, conn_id: &str) {
        let mut map = self.by_user.write().await;
        if map.get(&user_id).is_some_and(|h| h.conn_id == conn_id) {
            map.remove(&user_id);
        }
    }

    pub async fn get(&self, user_id: i64) -> Option<ConnectionHandle> {
        self.by_user.read().await.get(&user_id).cloned()
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        self.by_user.read().await.contains_key(&user_id)
    }

    pub async fn count(&self) -> usize {
        self.by_user.read().await.len()
    }
}
