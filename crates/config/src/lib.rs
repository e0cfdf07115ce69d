//! Server configuration: listen address, database URL, and PBKDF2 cost
//! factor, loaded from `parlor.toml`/`.yaml`/`.json` with `PARLOR_*`
//! environment overrides and `${ENV_VAR}` substitution in values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, config_dir, discover_and_load, load_config};
pub use schema::ServerConfig;
