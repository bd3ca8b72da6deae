use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::watch::{Presence, WatchSet};

/// Current operational state of the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No target server connection; polls are swallowed.
    Disconnected,
    /// Connected and polling the live-players endpoint.
    Scanning,
    /// Connected but scanning is paused; polls are swallowed.
    Paused,
}

/// One watched player as shown to a front-end. The online flag is the
/// explicit display state, never re-derived from a rendered label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub name: String,
    pub online: bool,
}

/// Runtime status written to status.toml on every state change.
/// Any front-end can read this file (read-only) to render the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    /// Base URL of the connected target, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// RFC 3339 timestamp of the last poll that produced a result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    /// Human-readable message of the most recent non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Watched players in display order.
    #[serde(default)]
    pub players: Vec<PlayerStatus>,
}

impl DaemonStatus {
    /// Constructs the initial disconnected status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Disconnected,
            url: None,
            last_activity: None,
            error: None,
            players: Vec::new(),
        }
    }

    /// Mirrors the watch-list into the status players.
    pub fn set_players(&mut self, watch: &WatchSet) {
        self.players = watch
            .snapshot()
            .iter()
            .map(|entry| PlayerStatus {
                name: entry.username.clone(),
                online: entry.presence == Presence::Online,
            })
            .collect();
    }
}

/// Serializes `status` to TOML and writes it to `path`, creating the
/// parent directory if needed. Logs failures instead of panicking — a
/// status write failure must never take the daemon down.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::error!("Failed to write status file: {e}");
            }
        }
        Err(e) => tracing::error!("Failed to serialize status: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Transition, TransitionKind};

    // ── DaemonStatus::new ─────────────────────────────────────────────────────

    #[test]
    fn new_starts_disconnected_and_empty() {
        let s = DaemonStatus::new();
        assert_eq!(s.state, DaemonState::Disconnected);
        assert!(s.url.is_none());
        assert!(s.last_activity.is_none());
        assert!(s.error.is_none());
        assert!(s.players.is_empty());
        assert_eq!(s.version, env!("CARGO_PKG_VERSION"));
    }

    // ── set_players ───────────────────────────────────────────────────────────

    #[test]
    fn set_players_mirrors_watch_list_order_and_presence() {
        let mut watch = WatchSet::from_names(["Alice", "Bob"]);
        watch.apply(&Transition {
            username: "Bob".to_string(),
            kind: TransitionKind::WentOnline,
        });

        let mut status = DaemonStatus::new();
        status.set_players(&watch);

        assert_eq!(status.players.len(), 2);
        assert_eq!(status.players[0].name, "Alice");
        assert!(!status.players[0].online);
        assert_eq!(status.players[1].name, "Bob");
        assert!(status.players[1].online);
    }

    // ── serialization ─────────────────────────────────────────────────────────

    #[test]
    fn state_serializes_to_lowercase() {
        let mut s = DaemonStatus::new();
        assert!(toml::to_string_pretty(&s).unwrap().contains("state = \"disconnected\""));

        s.state = DaemonState::Scanning;
        assert!(toml::to_string_pretty(&s).unwrap().contains("state = \"scanning\""));

        s.state = DaemonState::Paused;
        assert!(toml::to_string_pretty(&s).unwrap().contains("state = \"paused\""));
    }

    #[test]
    fn serialization_omits_unset_optional_fields() {
        let content = toml::to_string_pretty(&DaemonStatus::new()).unwrap();
        assert!(!content.contains("url"));
        assert!(!content.contains("last_activity"));
        assert!(!content.contains("error"));
    }

    // ── write_status ──────────────────────────────────────────────────────────

    #[test]
    fn write_status_creates_file_and_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.toml");
        write_status(&path, &DaemonStatus::new());
        assert!(path.exists());
    }

    #[test]
    fn write_status_content_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");

        let mut original = DaemonStatus::new();
        original.state = DaemonState::Scanning;
        original.url = Some("http://example.com:8100".to_string());
        original.set_players(&WatchSet::from_names(["Alice"]));

        write_status(&path, &original);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: DaemonStatus = toml::from_str(&content).unwrap();
        assert_eq!(parsed.state, DaemonState::Scanning);
        assert_eq!(parsed.url.as_deref(), Some("http://example.com:8100"));
        assert_eq!(parsed.players.len(), 1);
        assert_eq!(parsed.players[0].name, "Alice");
        assert!(!parsed.players[0].online);
    }
}
