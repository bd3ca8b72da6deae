use thiserror::Error;

/// Failure fetching the player roster from the map server.
///
/// The two variants deserve different reactions: a network failure is
/// transient (skip this poll, try again next tick) while a protocol
/// failure means the endpoint exists but is not a map server — almost
/// always a misconfigured URL the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response from server: {0}")]
    Protocol(String),
}

/// Failure establishing a connection to a target server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The URL has no protocol prefix. Surfaced separately so the
    /// suggested fix can be specific ("add http:// or https://").
    #[error("\"{0}\" is missing its http:// or https:// prefix")]
    MissingScheme(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Rejected mutation of the watch-list. No retry semantics; the
/// attempted change simply does not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("\"{0}\" is already on the watch-list")]
    DuplicateWatch(String),

    #[error("no watch-list entry at index {0}")]
    IndexOutOfRange(usize),
}
