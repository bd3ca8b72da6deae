use crate::client::Roster;

/// A detected presence change for one watched username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub username: String,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    WentOnline,
    WentOffline,
}

/// Compares two rosters restricted to the watched usernames and
/// returns the presence transitions between them.
///
/// Usernames are matched by exact string equality — callers must pass
/// bare usernames, never rendered labels. Output order follows
/// `watched`, not either roster's internal order, so downstream
/// consumers see deterministic updates.
///
/// With no baseline (`previous` is `None`) nothing is emitted: there
/// is no transition before a first successful fetch, no matter who is
/// online in `current`.
pub fn diff(previous: Option<&Roster>, current: &Roster, watched: &[String]) -> Vec<Transition> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut transitions = Vec::new();
    for username in watched {
        let was_present = previous.contains(username);
        let is_present = current.contains(username);
        match (was_present, is_present) {
            (false, true) => transitions.push(Transition {
                username: username.clone(),
                kind: TransitionKind::WentOnline,
            }),
            (true, false) => transitions.push(Transition {
                username: username.clone(),
                kind: TransitionKind::WentOffline,
            }),
            _ => {} // No change.
        }
    }
    transitions
}
