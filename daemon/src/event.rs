use crate::config::WatchConfig;
use crate::diff::Transition;
use crate::error::FetchError;

/// Everything the daemon's event loop reacts to, from all sources:
/// the poll scheduler, the config file watcher, and signal handlers.
#[derive(Debug)]
pub enum DaemonEvent {
    /// A watched player's presence changed.
    Transition(Transition),
    /// A periodic poll failed. The roster baseline is untouched and
    /// the next tick proceeds normally.
    FetchFailed(FetchError),
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(WatchConfig),
    /// SIGUSR1 received; pause or resume scanning without disconnecting.
    ToggleScanning,
    /// Ctrl+C received; the daemon should persist config and exit.
    Shutdown,
}
