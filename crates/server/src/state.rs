use std::sync::Arc;

use parlor_auth::Hasher;
use parlor_config::ServerConfig;
use parlor_db::Repository;

use crate::{rooms::RoomRegistry, sessions::SessionRegistry};

/// Shared server state, handed by reference (behind an `Arc`) to every
/// connection task: the data repository, the two in-memory registries, and
/// the configured password hasher.
pub struct ServerState {
    pub repo: Repository,
    pub sessions: SessionRegistry,
    pub rooms: RoomRegistry,
    pub hasher: Hasher,
}

pub type SharedState = Arc<ServerState>;

impl ServerState {
    pub fn new(repo: Repository, config: &ServerConfig) -> SharedState {
        Arc::new(Self {
            repo,
            sessions: SessionRegistry::new(),
            rooms: RoomRegistry::new(),
            hasher: Hasher::with_iterations(config.pbkdf2_iterations),
        })
    }
}
