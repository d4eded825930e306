//! Layered configuration (§6.3): `codegraph.toml` at the project root,
//! then `CODEGRAPH_`-prefixed environment variables (including a local
//! `.env` via `dotenvy`), then CLI flags — each layer overriding the one
//! before it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_ignore_file() -> String {
    ".gitignore".to_string()
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_max_nodes() -> usize {
    1000
}

fn default_max_depth() -> usize {
    10
}

fn default_pattern_set_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    #[serde(default)]
    pub enable_cache: Option<bool>,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub cache_ttl_seconds: Option<u64>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_true")]
    pub watcher_enabled: bool,
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
    #[serde(default = "default_pattern_set_version")]
    pub pattern_set_version: u32,
    #[serde(default = "default_max_nodes")]
    pub max_nodes_per_traversal: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth_per_traversal: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_root: None,
            enable_cache: None,
            redis_url: None,
            cache_ttl_seconds: None,
            debounce_ms: default_debounce_ms(),
            watcher_enabled: true,
            ignore_file: default_ignore_file(),
            pattern_set_version: default_pattern_set_version(),
            max_nodes_per_traversal: default_max_nodes(),
            max_depth_per_traversal: default_max_depth(),
        }
    }
}

impl Config {
    /// Load `codegraph.toml` (if present) from `root`, then overlay
    /// `CODEGRAPH_`-prefixed environment variables, loading a local
    /// `.env` first via `dotenvy` for convenience.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match std::fs::read_to_string(root.join("codegraph.toml")) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(_) => Config::default(),
        };

        if let Ok(url) = std::env::var("CODEGRAPH_REDIS_URL") {
            config.redis_url = Some(url);
        }
        if let Ok(val) = std::env::var("CODEGRAPH_ENABLE_CACHE") {
            config.enable_cache = val.parse().ok();
        }
        if let Ok(val) = std::env::var("CODEGRAPH_CACHE_TTL_SECONDS") {
            if let Ok(secs) = val.parse() {
                config.cache_ttl_seconds = Some(secs);
            }
        }
        if let Ok(val) = std::env::var("CODEGRAPH_DEBOUNCE_MS") {
            if let Ok(ms) = val.parse() {
                config.debounce_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("CODEGRAPH_WATCHER_ENABLED") {
            if let Ok(enabled) = val.parse() {
                config.watcher_enabled = enabled;
            }
        }
        if let Ok(val) = std::env::var("CODEGRAPH_IGNORE_FILE") {
            config.ignore_file = val;
        }

        Ok(config)
    }

    /// Whether the cache layer should enable L2: explicit opt-in, or
    /// implicitly on whenever a redis URL is configured.
    pub fn cache_enabled(&self) -> bool {
        self.enable_cache.unwrap_or(self.redis_url.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_when_no_toml_present() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.debounce_ms, 2000);
        assert_eq!(config.max_depth_per_traversal, 10);
        assert!(!config.cache_enabled());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("codegraph.toml"), "debounce_ms = 500\nwatcher_enabled = false\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.debounce_ms, 500);
        assert!(!config.watcher_enabled);
    }

    #[test]
    fn cache_enabled_follows_redis_url_when_unset() {
        let mut config = Config::default();
        assert!(!config.cache_enabled());
        config.redis_url = Some("redis://localhost".to_string());
        assert!(config.cache_enabled());
    }
}
