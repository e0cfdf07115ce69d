use serde::{Deserialize, Serialize};

/// Server configuration: where to listen, where the SQLite store lives, and
/// the PBKDF2 cost factor for new password hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub pbkdf2_iterations: u32,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".into(),
            database_url: "sqlite://parlor.db?mode=rwc".into(),
            pbkdf2_iterations: parlor_auth::DEFAULT_ITERATIONS,
            log_level: "info".into(),
            json_logs: false,
        }
    }
}
