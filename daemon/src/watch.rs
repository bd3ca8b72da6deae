use crate::diff::{Transition, TransitionKind};
use crate::error::WatchError;

/// Display state of a watched player. Kept as an explicit field rather
/// than encoded into a rendered label so nothing ever has to parse a
/// display string to recover it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Offline,
}

/// One watched username and its last-known presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub username: String,
    pub presence: Presence,
}

/// The user-curated, ordered list of usernames to watch.
///
/// Order is display order only; it carries no meaning for diffing.
/// The one invariant is uniqueness: no username appears twice.
#[derive(Debug, Default)]
pub struct WatchSet {
    entries: Vec<WatchEntry>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a watch-list from persisted config usernames. Duplicates
    /// in the file are dropped with a warning rather than failing
    /// startup.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for name in names {
            if let Err(e) = set.add(name) {
                tracing::warn!("Skipping config entry: {e}");
            }
        }
        set
    }

    /// Appends `username` with initial state [`Presence::Offline`].
    /// The match against existing entries is case-sensitive and exact,
    /// mirroring the exact-username contract of the map server.
    pub fn add(&mut self, username: impl Into<String>) -> Result<(), WatchError> {
        let username = username.into();
        if self.entries.iter().any(|e| e.username == username) {
            return Err(WatchError::DuplicateWatch(username));
        }
        self.entries.push(WatchEntry {
            username,
            presence: Presence::Offline,
        });
        Ok(())
    }

    /// Removes and returns the entry at `index`.
    ///
    /// `add` and `remove` are the mutation surface for a front-end
    /// embedding this list directly; the daemon itself applies
    /// watch-list edits wholesale via [`WatchSet::sync_names`] when
    /// the config file is reloaded.
    pub fn remove(&mut self, index: usize) -> Result<WatchEntry, WatchError> {
        if index >= self.entries.len() {
            return Err(WatchError::IndexOutOfRange(index));
        }
        Ok(self.entries.remove(index))
    }

    /// Read-only view in display order, for rendering and persistence.
    pub fn snapshot(&self) -> &[WatchEntry] {
        &self.entries
    }

    /// The watched usernames in display order.
    pub fn usernames(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.username.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Records a presence transition reported by the differ.
    /// A transition for an unwatched name is ignored.
    pub fn apply(&mut self, transition: &Transition) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.username == transition.username)
        {
            entry.presence = match transition.kind {
                TransitionKind::WentOnline => Presence::Online,
                TransitionKind::WentOffline => Presence::Offline,
            };
        }
    }

    /// Replaces the list with `names` (in their order), keeping the
    /// known presence of any username that survives the swap. Used on
    /// config reload so an edit to the file doesn't forget who is
    /// online. Duplicates in `names` are dropped.
    pub fn sync_names(&mut self, names: &[String]) {
        let old = std::mem::take(&mut self.entries);
        for name in names {
            let presence = old
                .iter()
                .find(|e| &e.username == name)
                .map(|e| e.presence)
                .unwrap_or(Presence::Offline);
            if self.entries.iter().any(|e| &e.username == name) {
                continue;
            }
            self.entries.push(WatchEntry {
                username: name.clone(),
                presence,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── add ───────────────────────────────────────────────────────────────────

    #[test]
    fn add_appends_offline_entry_at_end() {
        let mut set = WatchSet::new();
        set.add("Alice").unwrap();
        set.add("Bob").unwrap();
        let snapshot = set.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].username, "Bob");
        assert_eq!(snapshot[1].presence, Presence::Offline);
    }

    #[test]
    fn add_duplicate_is_rejected_and_leaves_list_unchanged() {
        let mut set = WatchSet::new();
        set.add("Alice").unwrap();
        let err = set.add("Alice").unwrap_err();
        assert_eq!(err, WatchError::DuplicateWatch("Alice".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn add_same_name_different_case_is_allowed() {
        let mut set = WatchSet::new();
        set.add("Alice").unwrap();
        assert!(set.add("alice").is_ok());
        assert_eq!(set.len(), 2);
    }

    // ── remove ────────────────────────────────────────────────────────────────

    #[test]
    fn remove_returns_the_entry() {
        let mut set = WatchSet::from_names(["Alice", "Bob"]);
        let removed = set.remove(0).unwrap();
        assert_eq!(removed.username, "Alice");
        assert_eq!(set.usernames(), vec!["Bob".to_string()]);
    }

    #[test]
    fn remove_out_of_range_fails() {
        let mut set = WatchSet::from_names(["Alice"]);
        let err = set.remove(1).unwrap_err();
        assert_eq!(err, WatchError::IndexOutOfRange(1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_from_empty_list_fails() {
        let mut set = WatchSet::new();
        assert_eq!(
            set.remove(0).unwrap_err(),
            WatchError::IndexOutOfRange(0)
        );
        assert!(set.is_empty());
    }

    // ── from_names ────────────────────────────────────────────────────────────

    #[test]
    fn from_names_preserves_order() {
        let set = WatchSet::from_names(["Carol", "Alice", "Bob"]);
        assert_eq!(
            set.usernames(),
            vec!["Carol".to_string(), "Alice".to_string(), "Bob".to_string()]
        );
    }

    #[test]
    fn from_names_drops_duplicates() {
        let set = WatchSet::from_names(["Alice", "Alice", "Bob"]);
        assert_eq!(set.usernames(), vec!["Alice".to_string(), "Bob".to_string()]);
    }

    // ── apply ─────────────────────────────────────────────────────────────────

    #[test]
    fn apply_updates_presence() {
        let mut set = WatchSet::from_names(["Alice"]);
        set.apply(&Transition {
            username: "Alice".to_string(),
            kind: TransitionKind::WentOnline,
        });
        assert_eq!(set.snapshot()[0].presence, Presence::Online);

        set.apply(&Transition {
            username: "Alice".to_string(),
            kind: TransitionKind::WentOffline,
        });
        assert_eq!(set.snapshot()[0].presence, Presence::Offline);
    }

    #[test]
    fn apply_for_unwatched_name_is_a_no_op() {
        let mut set = WatchSet::from_names(["Alice"]);
        set.apply(&Transition {
            username: "Bob".to_string(),
            kind: TransitionKind::WentOnline,
        });
        assert_eq!(set.len(), 1);
        assert_eq!(set.snapshot()[0].presence, Presence::Offline);
    }

    // ── sync_names ────────────────────────────────────────────────────────────

    #[test]
    fn sync_names_keeps_presence_of_surviving_entries() {
        let mut set = WatchSet::from_names(["Alice", "Bob"]);
        set.apply(&Transition {
            username: "Alice".to_string(),
            kind: TransitionKind::WentOnline,
        });

        set.sync_names(&["Bob".to_string(), "Alice".to_string(), "Carol".to_string()]);

        let snapshot = set.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].username, "Bob");
        assert_eq!(snapshot[1].username, "Alice");
        assert_eq!(snapshot[1].presence, Presence::Online);
        assert_eq!(snapshot[2].username, "Carol");
        assert_eq!(snapshot[2].presence, Presence::Offline);
    }

    #[test]
    fn sync_names_removes_absent_entries() {
        let mut set = WatchSet::from_names(["Alice", "Bob"]);
        set.sync_names(&["Bob".to_string()]);
        assert_eq!(set.usernames(), vec!["Bob".to_string()]);
    }

    #[test]
    fn sync_names_drops_duplicates() {
        let mut set = WatchSet::new();
        set.sync_names(&["Alice".to_string(), "Alice".to_string()]);
        assert_eq!(set.len(), 1);
    }
}
