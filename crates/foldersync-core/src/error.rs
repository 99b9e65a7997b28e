//! Error types for the folder sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for folder sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the folder sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Folders are not both selected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The synchronize call reported a failure
    #[error("Sync failed: {0}")]
    SyncFailure(String),

    /// A synchronize call is already outstanding
    #[error("A synchronization is already in progress")]
    SyncInFlight,

    /// The monitor session refused to start monitoring
    #[error("Failed to start monitoring: {0}")]
    MonitoringStartFailure(String),

    /// Polling frequency outside the accepted range
    #[error("Polling frequency {0}s is out of range (1-60s)")]
    FrequencyOutOfRange(u64),

    /// The controller task is no longer running
    #[error("Controller has stopped")]
    ControllerStopped,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings store errors
    #[error("Settings store error: {0}")]
    SettingsStore(String),

    /// Synchronizer backend errors
    #[error("Synchronizer error ({synchronizer}): {message}")]
    Synchronizer {
        /// Synchronizer name
        synchronizer: String,
        /// Error message
        message: String,
    },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a sync failure error
    pub fn sync_failure(reason: impl Into<String>) -> Self {
        Self::SyncFailure(reason.into())
    }

    /// Create a monitoring start failure
    pub fn monitoring_start(msg: impl Into<String>) -> Self {
        Self::MonitoringStartFailure(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a settings store error
    pub fn settings_store(msg: impl Into<String>) -> Self {
        Self::SettingsStore(msg.into())
    }

    /// Create a synchronizer-specific error
    pub fn synchronizer(synchronizer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Synchronizer {
            synchronizer: synchronizer.into(),
            message: message.into(),
        }
    }

    /// The human-readable reason shown to the user for a failed sync.
    ///
    /// A `SyncFailure` yields its bare reason; every other variant yields its
    /// display text.
    pub fn failure_reason(&self) -> String {
        match self {
            Self::SyncFailure(reason) => reason.clone(),
            Self::Synchronizer { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
