mod client;
mod config;
mod controller;
mod diff;
mod error;
mod event;
mod paths;
mod scheduler;
mod status;
mod watch;

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, RwLock};
use tracing_subscriber::EnvFilter;

use crate::client::RosterClient;
use crate::config::WatchConfig;
use crate::controller::ConnectionController;
use crate::diff::TransitionKind;
use crate::error::ConnectError;
use crate::event::DaemonEvent;
use crate::scheduler::PollContext;
use crate::status::{DaemonState, DaemonStatus};
use crate::watch::WatchSet;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        tracing::error!("Config error (using defaults): {e:#}");
        WatchConfig::default()
    });
    let initial_url = initial_config.url.clone();
    let watch = Arc::new(RwLock::new(WatchSet::from_names(
        initial_config.usernames.clone(),
    )));
    let shared_config = Arc::new(RwLock::new(initial_config));

    // ── Core state ────────────────────────────────────────────────────────────
    let ctx = Arc::new(Mutex::new(PollContext::default()));
    let mut controller = ConnectionController::new(Arc::clone(&ctx));
    let client = RosterClient::new().unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client: {e}");
        std::process::exit(1);
    });

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = DaemonStatus::new();
    current_status.set_players(&*watch.read().await);
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path.clone(), event_tx.clone()));
    tokio::spawn(scheduler::run(
        client.clone(),
        Arc::clone(&shared_config),
        Arc::clone(&ctx),
        Arc::clone(&watch),
        event_tx.clone(),
    ));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    // SIGUSR1 pauses/resumes scanning — the headless counterpart of a
    // "Stop scanning" toggle.
    #[cfg(unix)]
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut stream = match signal(SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("SIGUSR1 handler unavailable: {e}");
                    return;
                }
            };
            while stream.recv().await.is_some() {
                if tx.send(DaemonEvent::ToggleScanning).await.is_err() {
                    break;
                }
            }
        });
    }

    tracing::info!("lookout-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Initial connect ───────────────────────────────────────────────────────
    // Deliberately blocks startup: the user configured this target and
    // must hear about a bad URL immediately, not on some later tick.
    if initial_url.is_empty() {
        tracing::info!(
            "No target URL configured; set one in {} to start watching",
            config_path.display()
        );
    } else {
        attempt_connect(
            &mut controller,
            &client,
            &initial_url,
            &mut current_status,
            &status_path,
        )
        .await;
    }

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            DaemonEvent::Transition(transition) => {
                match transition.kind {
                    TransitionKind::WentOnline => {
                        tracing::info!("Player \"{}\" is online!", transition.username)
                    }
                    TransitionKind::WentOffline => {
                        tracing::info!("Player \"{}\" went offline", transition.username)
                    }
                }
                {
                    let mut w = watch.write().await;
                    w.apply(&transition);
                    current_status.set_players(&w);
                }
                current_status.last_activity = Some(now_rfc3339());
                current_status.error = None;
                status::write_status(&status_path, &current_status);
            }

            DaemonEvent::FetchFailed(e) => {
                tracing::warn!("Unable to retrieve player data from the target: {e}");
                current_status.last_activity = Some(now_rfc3339());
                current_status.error = Some(e.to_string());
                status::write_status(&status_path, &current_status);
            }

            DaemonEvent::ConfigReloaded(new_config) => {
                tracing::info!("Config reloaded");
                let url_changed = shared_config.read().await.url != new_config.url;
                {
                    let mut w = watch.write().await;
                    w.sync_names(&new_config.usernames);
                    current_status.set_players(&w);
                }
                let new_url = new_config.url.clone();
                *shared_config.write().await = new_config;

                if url_changed {
                    if controller.is_connected() {
                        controller.disconnect();
                        current_status.url = None;
                    }
                    if new_url.is_empty() {
                        tracing::info!("Target URL cleared; disconnected");
                        current_status.state = DaemonState::Disconnected;
                    } else {
                        attempt_connect(
                            &mut controller,
                            &client,
                            &new_url,
                            &mut current_status,
                            &status_path,
                        )
                        .await;
                    }
                }
                status::write_status(&status_path, &current_status);
            }

            DaemonEvent::ToggleScanning => {
                if controller.is_connected() {
                    let scanning = !controller.is_scanning();
                    controller.set_scanning(scanning);
                    if scanning {
                        tracing::info!("Scanning resumed");
                    } else {
                        tracing::info!("Scanning paused");
                    }
                    current_status.state = daemon_state(&controller);
                    status::write_status(&status_path, &current_status);
                } else {
                    tracing::info!("Not connected; scanning toggle ignored");
                }
            }

            DaemonEvent::Shutdown => {
                tracing::info!("Shutting down");
                let snapshot = {
                    let cfg = shared_config.read().await;
                    WatchConfig {
                        url: cfg.url.clone(),
                        usernames: watch.read().await.usernames(),
                        interval_secs: cfg.interval_secs,
                    }
                };
                if let Err(e) = config::save(&config_path, &snapshot) {
                    tracing::error!("Failed to save config: {e:#}");
                }
                controller.disconnect();
                current_status.state = DaemonState::Disconnected;
                current_status.url = None;
                status::write_status(&status_path, &current_status);
                break;
            }
        }
    }
}

/// One connect attempt with user-facing reporting. Failures leave the
/// daemon disconnected; the error lands in the log and the status file
/// with a hint specific to the error kind.
async fn attempt_connect(
    controller: &mut ConnectionController,
    client: &RosterClient,
    url: &str,
    status: &mut DaemonStatus,
    status_path: &Path,
) {
    tracing::info!("Connecting to target {url} (this may take a moment)");
    match controller.connect(client, url).await {
        Ok(()) => {
            tracing::info!("Connected to target {url}");
            status.url = Some(url.to_string());
            status.error = None;
        }
        Err(e @ ConnectError::MissingScheme(_)) => {
            tracing::error!("Failed to connect: {e}");
            status.error = Some(e.to_string());
        }
        Err(ConnectError::Fetch(e)) => {
            tracing::error!(
                "Error while connecting to target \"{url}\": {e}. \
                 Check that the URL is correct and uses the right scheme \
                 (http vs https)."
            );
            status.error = Some(e.to_string());
        }
    }
    status.state = daemon_state(controller);
    status::write_status(status_path, status);
}

fn daemon_state(controller: &ConnectionController) -> DaemonState {
    if !controller.is_connected() {
        DaemonState::Disconnected
    } else if controller.is_scanning() {
        DaemonState::Scanning
    } else {
        DaemonState::Paused
    }
}

fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}
