//! Error types for poller operations

/// Errors from the polling engine.
///
/// Upstream failures are not errors here: they reach update handlers as
/// `FetchResult`s with `ok = false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("poller is shut down")]
    Shutdown,
}

/// Result alias for poller operations.
pub type Result<T> = std::result::Result<T, Error>;
