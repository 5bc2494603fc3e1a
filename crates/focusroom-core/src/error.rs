//! Core error types for focusroom-core.
//!
//! Each concern gets its own `thiserror` enum; [`CoreError`] aggregates them
//! for callers that do not care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engine misuse or lifecycle errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Session log errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse a configuration value
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Engine lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A command reached an engine that was already torn down.
    #[error("engine disposed: '{command}' called after teardown")]
    Disposed { command: &'static str },

    /// The async service task is no longer running.
    #[error("engine service stopped")]
    ServiceStopped,

    /// A configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure reported by a sound or notification capability.
///
/// Never propagated out of the engine; the effect dispatcher logs it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The host refused playback (autoplay policy, muted device, ...)
    #[error("playback blocked: {0}")]
    PlaybackBlocked(String),

    /// The host has no usable output for this effect
    #[error("effect unavailable: {0}")]
    Unavailable(String),

    /// Notification permission is missing
    #[error("notification permission denied")]
    PermissionDenied,
}

/// Session log errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Record not found
    #[error("Session record {0} not found")]
    NotFound(i64),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
