//! Unified error types for stash.
//!
//! Construction failures (configuration, initialization, store, schema) are
//! fatal and abort opening a cache. A cache miss is never an error; only
//! genuine storage-engine failures surface from steady-state operations.

use std::path::PathBuf;

use tokio_rusqlite::rusqlite;

/// Unified error type for the stash cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required capability (storage backend/driver) is not available.
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),

    /// A required option is missing (e.g. no `database` configured).
    #[error("INITIALIZATION_ERROR: {0}")]
    Initialization(String),

    /// The backing store cannot be created or opened.
    #[error("STORE_UNAVAILABLE: {path}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    /// Schema creation failed on a fresh store.
    #[error("SCHEMA_ERROR: {0}")]
    Schema(String),

    /// An invalidation pattern could not be compiled.
    #[error("INVALID_PATTERN: {0}")]
    InvalidPattern(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),
}

impl Error {
    pub(crate) fn store_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StoreUnavailable { path: path.into(), reason: reason.to_string() }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
