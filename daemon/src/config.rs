use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Persisted daemon configuration, read from and written back to
/// config.toml. This is the only shape the daemon exchanges with the
/// storage medium; everything else lives for the process session only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Base URL of the target map server, e.g. "http://example.com:8100".
    /// Empty means not configured; the daemon starts disconnected.
    #[serde(default)]
    pub url: String,
    /// Usernames to watch, in display order.
    #[serde(default)]
    pub usernames: Vec<String>,
    /// Poll interval in seconds. Stored canonically in seconds; only
    /// converted to a timer duration at the scheduling boundary.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            usernames: Vec::new(),
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl WatchConfig {
    /// Poll interval clamped to [1s, 1h]. A zero interval in the file
    /// would spin the scheduler; anything above an hour is assumed to
    /// be a typo.
    pub fn effective_interval(&self) -> u64 {
        self.interval_secs
            .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
    }
}

/// Loads the config file at `path`, returning `WatchConfig::default()`
/// if the file does not exist. Returns an error if the file exists but
/// cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<WatchConfig> {
    if !path.exists() {
        return Ok(WatchConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Writes `config` to `path` as TOML, creating parent directories as
/// needed. Called once at shutdown so edits made while the daemon runs
/// (watch-list changes applied via reload) survive the session.
pub fn save(path: &Path, config: &WatchConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`. Whenever
/// the config file is created or modified, reloads it and sends a
/// `ConfigReloaded` event on the daemon bus.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Failed to create config file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file itself so that
    // editor-style atomic saves (write-new then rename) are caught.
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            tracing::error!("Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        tracing::error!("Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );
        if !affects_config || !is_write {
            continue;
        }

        match load_or_default(&path) {
            Ok(config) => {
                if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Ignoring config reload: {e}"),
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_is_unconfigured() {
        let config = WatchConfig::default();
        assert!(config.url.is_empty());
        assert!(config.usernames.is_empty());
        assert_eq!(config.interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    // ── effective_interval ────────────────────────────────────────────────────

    #[test]
    fn effective_interval_passes_through_sane_values() {
        let config = WatchConfig {
            interval_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.effective_interval(), 30);
    }

    #[test]
    fn effective_interval_clamps_zero_to_min() {
        let config = WatchConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_interval(), MIN_POLL_INTERVAL_SECS);
    }

    #[test]
    fn effective_interval_clamps_above_max() {
        let config = WatchConfig {
            interval_secs: 1_000_000,
            ..Default::default()
        };
        assert_eq!(config.effective_interval(), MAX_POLL_INTERVAL_SECS);
    }

    // ── load_or_default ───────────────────────────────────────────────────────

    #[test]
    fn load_or_default_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_or_default(&path).unwrap();
        assert_eq!(config, WatchConfig::default());
    }

    #[test]
    fn load_or_default_parses_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
url = "http://example.com:8100"
usernames = ["Alice", "Bob"]
interval_secs = 30
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.url, "http://example.com:8100");
        assert_eq!(
            config.usernames,
            vec!["Alice".to_string(), "Bob".to_string()]
        );
        assert_eq!(config.interval_secs, 30);
    }

    #[test]
    fn load_or_default_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "url = \"http://example.com\"\n").unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.url, "http://example.com");
        assert!(config.usernames.is_empty());
        assert_eq!(config.interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn load_or_default_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml ][[[").unwrap();
        assert!(load_or_default(&path).is_err());
    }

    // ── save ──────────────────────────────────────────────────────────────────

    #[test]
    fn save_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = WatchConfig {
            url: "http://example.com:8100".to_string(),
            usernames: vec!["Alice".to_string(), "Bob".to_string()],
            interval_secs: 45,
        };

        save(&path, &config).unwrap();
        let loaded = load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save(&path, &WatchConfig::default()).unwrap();
        assert!(path.exists());
    }
}
