use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::error::FetchError;

/// Path of the live-players endpoint relative to the configured base URL.
pub const PLAYERS_PATH: &str = "/live/players";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The set of player names present on the server at one instant.
///
/// Produced fresh by every fetch and never mutated afterwards; the
/// scheduler swaps whole rosters rather than editing one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: HashSet<String>,
}

impl Roster {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact, case-sensitive membership test — usernames are compared
    /// verbatim against what the server reports.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Wire shape of the live-players endpoint. Extra fields on player
/// objects (position, world, …) are ignored; a missing `players`
/// array or `name` field is a protocol error.
#[derive(Debug, Deserialize)]
struct PlayersBody {
    players: Vec<PlayerEntry>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    name: String,
}

/// Parses a live-players response body into a [`Roster`].
pub(crate) fn parse_roster(body: &str) -> Result<Roster, FetchError> {
    let parsed: PlayersBody =
        serde_json::from_str(body).map_err(|e| FetchError::Protocol(e.to_string()))?;
    Ok(Roster {
        names: parsed.players.into_iter().map(|p| p.name).collect(),
    })
}

/// Source of player rosters. The scheduler and controller are generic
/// over this so tests can drive them with a scripted fake instead of a
/// live server.
pub trait RosterFetch {
    /// Lightweight existence check: is there a map server answering at
    /// `base_url`? Does not parse the body.
    fn probe(&self, base_url: &str) -> impl Future<Output = Result<(), FetchError>> + Send;

    /// Fetches and parses the current roster.
    fn fetch(&self, base_url: &str) -> impl Future<Output = Result<Roster, FetchError>> + Send;
}

/// HTTP implementation of [`RosterFetch`]. Holds no state beyond the
/// connection pool; cheap to clone.
#[derive(Debug, Clone)]
pub struct RosterClient {
    http: reqwest::Client,
}

impl RosterClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

impl RosterFetch for RosterClient {
    async fn probe(&self, base_url: &str) -> Result<(), FetchError> {
        let response = self
            .http
            .get(players_url(base_url))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Protocol(format!(
                "players endpoint answered with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch(&self, base_url: &str) -> Result<Roster, FetchError> {
        let response = self
            .http
            .get(players_url(base_url))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Protocol(format!(
                "players endpoint answered with status {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_roster(&body)
    }
}

fn players_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), PLAYERS_PATH)
}
