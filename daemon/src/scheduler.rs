use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::client::{Roster, RosterFetch};
use crate::config::WatchConfig;
use crate::diff;
use crate::event::DaemonEvent;
use crate::watch::WatchSet;

/// Shared polling state. Mutated only by the scheduler's tick handler
/// (baseline advance on a successful fetch) and the connection
/// controller (connect/disconnect/pause); the mutex serializes the two.
#[derive(Debug, Default)]
pub struct PollContext {
    /// Set by the controller on connect, cleared on disconnect.
    pub connected: bool,
    /// Scanning toggle; polling is gated on `connected && active`.
    pub active: bool,
    /// The most recent successfully fetched roster — the "previous"
    /// side of the next diff. `None` until the first fetch after
    /// connecting.
    pub last_roster: Option<Roster>,
}

/// Polls the live-players endpoint on the configured interval and
/// emits [`DaemonEvent::Transition`] for every watched player whose
/// presence changed since the previous successful poll.
///
/// Runs until the event bus closes. Rules per tick:
/// - Not connected or paused: the tick is swallowed silently.
/// - Fetch failed: a [`DaemonEvent::FetchFailed`] is emitted and the
///   baseline is left untouched, so a transient outage never makes
///   every watched player appear to log off and back on.
/// - Fetch succeeded: transitions are emitted in watch-list order and
///   the new roster becomes the baseline.
///
/// The fetch is awaited inline and missed ticks are skipped, so at
/// most one fetch is ever in flight. Interval edits are picked up on
/// the next scheduling cycle, never retroactively.
pub async fn run<F>(
    fetcher: F,
    config: Arc<RwLock<WatchConfig>>,
    ctx: Arc<Mutex<PollContext>>,
    watch: Arc<RwLock<WatchSet>>,
    tx: mpsc::Sender<DaemonEvent>,
) where
    F: RosterFetch,
{
    let mut period = config.read().await.effective_interval();
    let mut ticker = new_ticker(period);

    loop {
        ticker.tick().await;

        let (url, configured) = {
            let cfg = config.read().await;
            (cfg.url.clone(), cfg.effective_interval())
        };
        if configured != period {
            tracing::info!("Poll interval changed to {configured}s");
            period = configured;
            ticker = new_ticker(period);
        }

        let (connected, active) = {
            let guard = ctx.lock().unwrap();
            (guard.connected, guard.active)
        };
        if !connected || !active {
            continue;
        }

        let watched = watch.read().await.usernames();

        // The mutex guard must not live across an await, so both arms
        // finish with the context inside a block before sending.
        match fetcher.fetch(&url).await {
            Err(e) => {
                tracing::warn!("Poll failed: {e}");
                {
                    let guard = ctx.lock().unwrap();
                    if !guard.connected || !guard.active {
                        // Disconnected or paused while the fetch was
                        // in flight; its failure has no owner either.
                        continue;
                    }
                }
                if tx.send(DaemonEvent::FetchFailed(e)).await.is_err() {
                    return;
                }
            }
            Ok(roster) => {
                let transitions = {
                    let mut guard = ctx.lock().unwrap();
                    if !guard.connected || !guard.active {
                        // Disconnected or paused while the fetch was in
                        // flight; the result no longer has an owner.
                        continue;
                    }
                    let transitions = diff::diff(guard.last_roster.as_ref(), &roster, &watched);
                    guard.last_roster = Some(roster);
                    transitions
                };

                for transition in transitions {
                    if tx.send(DaemonEvent::Transition(transition)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// A ticker whose first tick is one full period out (the connect path
/// has just seeded the baseline; polling immediately again would be
/// redundant) and which skips missed ticks instead of bursting.
fn new_ticker(period_secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(period_secs);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
