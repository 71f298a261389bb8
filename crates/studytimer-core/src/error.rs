//! Core error types for studytimer-core.
//!
//! This module defines the error hierarchy using thiserror. Storage fallback
//! is silent by design of the facade, so most of these only surface for
//! validation, import and timer-transition failures.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studytimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Timer transition errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Opening the database took longer than the configured bound
    #[error("Timed out opening database at {path} after {timeout_ms}ms")]
    OpenTimeout { path: PathBuf, timeout_ms: u64 },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Tag name is empty after trimming
    #[error("Tag name must not be empty")]
    EmptyTag,

    /// Zero-length sessions are never persisted
    #[error("Session duration must be greater than zero")]
    ZeroDuration,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Timer state machine errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimerError {
    /// Starting requires a selected tag
    #[error("No study tag selected")]
    NoTagSelected,

    /// The requested action is not valid from the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },
}

/// Import errors. Raised before any write, so a failed import changes nothing.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Document is not valid JSON of the export shape
    #[error("Failed to parse import document: {0}")]
    Parse(#[source] serde_json::Error),

    /// Document parsed but contains an invalid entry
    #[error("Invalid record under '{date}': {message}")]
    InvalidRecord { date: String, message: String },
}

/// Notification delivery errors. Always swallowed by the session controller.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification output failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("Notification unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
