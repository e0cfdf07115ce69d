use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ServerConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["parlor.toml", "parlor.yaml", "parlor.yml", "parlor.json"];

/// Load config from the given path (any supported format), substituting
/// `${ENV_VAR}` placeholders in the raw text first.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./parlor.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/parlor/parlor.{toml,yaml,yml,json}` (user-global)
///
/// Returns [`ServerConfig::default`] if no config file is found.
pub fn discover_and_load() -> ServerConfig {
    let mut cfg = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ServerConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        ServerConfig::default()
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `PARLOR_*` environment overrides on top of an already-loaded config.
pub fn apply_env_overrides(cfg: &mut ServerConfig) {
    if let Ok(v) = std::env::var("PARLOR_LISTEN_ADDR") {
        cfg.listen_addr = v;
    }
    if let Ok(v) = std::env::var("PARLOR_DATABASE_URL") {
        cfg.database_url = v;
    }
    if let Ok(v) = std::env::var("PARLOR_PBKDF2_ITERATIONS") {
        match v.parse() {
            Ok(n) => cfg.pbkdf2_iterations = n,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid PARLOR_PBKDF2_ITERATIONS"),
        }
    }
    if let Ok(v) = std::env::var("PARLOR_LOG_LEVEL") {
        cfg.log_level = v;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "parlor") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/parlor/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parlor").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ServerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        std::fs::write(&path, "listen_addr = \"0.0.0.0:9000\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
        assert_eq!(cfg.pbkdf2_iterations, ServerConfig::default().pbkdf2_iterations);
    }

    #[test]
    fn env_override_wins() {
        let mut cfg = ServerConfig::default();
        // SAFETY: tests run single-threaded per-process for env mutation here.
        unsafe {
            std::env::set_var("PARLOR_LISTEN_ADDR", "10.0.0.1:1234");
        }
        apply_env_overrides(&mut cfg);
        unsafe {
            std::env::remove_var("PARLOR_LISTEN_ADDR");
        }
        assert_eq!(cfg.listen_addr, "10.0.0.1:1234");
    }
}
