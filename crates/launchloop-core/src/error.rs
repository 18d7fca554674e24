//! Core error types for launchloop-core.
//!
//! Only I/O against the two stores is a true error. "Nothing to do"
//! outcomes of the streak engine (already complete, no active campaign)
//! are ordinary return values, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for launchloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local campaign store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote campaign directory errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local campaign store errors.
///
/// A failed write aborts its transaction; the last committed record stays
/// intact and no snapshot is published.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt value for key '{key}': {message}")]
    CorruptValue { key: String, message: String },

    /// The blocking worker running the transaction died
    #[error("Storage task failed: {0}")]
    TaskFailed(String),

    /// A previous writer panicked while holding the connection
    #[error("Storage connection lock poisoned")]
    Poisoned,

    /// Could not create the data directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote campaign directory errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The campaign document does not exist
    #[error("Campaign not found: {0}")]
    NotFound(String),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never completed (DNS, TLS, timeout, ...)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required input was blank
    #[error("{0}")]
    Blank(String),

    /// Join link did not match the expected shape
    #[error("Not a campaign join link: {0}")]
    InvalidJoinLink(String),

    /// Campaign id failed basic checks
    #[error("Invalid campaign id: '{0}'")]
    InvalidCampaignId(String),

    /// Could not find a free campaign id
    #[error("Could not allocate a unique campaign id after {0} attempts")]
    IdSpaceExhausted(usize),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::TaskFailed(err.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
