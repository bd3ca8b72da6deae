use std::sync::{Arc, Mutex};

use crate::client::RosterFetch;
use crate::error::ConnectError;
use crate::scheduler::PollContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Connect/disconnect lifecycle for the target server. This is the
/// only place the diff baseline is ever established: a successful
/// connect always ends with a seed fetch, so the first periodic poll
/// diffs against a roster from this session, never a stale one.
pub struct ConnectionController {
    state: ConnectionState,
    ctx: Arc<Mutex<PollContext>>,
}

impl ConnectionController {
    pub fn new(ctx: Arc<Mutex<PollContext>>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            ctx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// True while polling is actually happening (connected and not
    /// paused).
    pub fn is_scanning(&self) -> bool {
        let guard = self.ctx.lock().unwrap();
        guard.connected && guard.active
    }

    /// Connects to `url`: validates the scheme, probes the players
    /// endpoint, performs one roster fetch to seed the diff baseline,
    /// and enables polling.
    ///
    /// The caller is expected to wait: connecting is a deliberate,
    /// single-shot action bounded by the request timeout, and its
    /// outcome must be reported to the user immediately. Any failure
    /// leaves the controller `Disconnected` and the poll context
    /// untouched.
    pub async fn connect<F>(&mut self, fetcher: &F, url: &str) -> Result<(), ConnectError>
    where
        F: RosterFetch,
    {
        // Only the *absence* of a scheme is a validation error; a
        // present-but-unsupported scheme (ftp://…) reaches the probe
        // and surfaces as a transport failure.
        if !url.contains("://") {
            return Err(ConnectError::MissingScheme(url.to_string()));
        }

        self.state = ConnectionState::Connecting;

        if let Err(e) = fetcher.probe(url).await {
            self.state = ConnectionState::Disconnected;
            return Err(e.into());
        }

        let seed = match fetcher.fetch(url).await {
            Ok(roster) => roster,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                return Err(e.into());
            }
        };

        {
            let mut guard = self.ctx.lock().unwrap();
            guard.connected = true;
            guard.active = true;
            guard.last_roster = Some(seed);
        }
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Drops the connection. Only ever triggered by an explicit user
    /// action — fetch failures during polling never land here, so a
    /// flaky network cannot silently end a watch session.
    ///
    /// The baseline roster is kept; connect always reseeds it, and
    /// keeping it costs nothing while disconnected.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        let mut guard = self.ctx.lock().unwrap();
        guard.connected = false;
        guard.active = false;
    }

    /// Pauses or resumes scanning without touching the connection.
    /// Ignored while disconnected.
    pub fn set_scanning(&mut self, on: bool) {
        if self.state != ConnectionState::Connected {
            return;
        }
        self.ctx.lock().unwrap().active = on;
    }
}
