// # Settings Store Trait
//
// Defines the interface for persisting the user's choices between runs.
//
// ## Purpose
//
// The settings store remembers:
// - The selected source and destination folders
// - The polling frequency
// - Whether the user wants monitoring on
//
// The controller saves after each accepted change and restores at startup.
//
// ## Implementations
//
// - Memory: `MemorySettingsStore`
// - File-based: `FileSettingsStore` (JSON with backup)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PollingInterval;

/// Persisted controller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Selected source folder (may be empty)
    #[serde(default)]
    pub source_folder: String,
    /// Selected destination folder (may be empty)
    #[serde(default)]
    pub destination_folder: String,
    /// Seconds between automatic synchronizations
    #[serde(default)]
    pub polling_frequency: PollingInterval,
    /// Monitoring intent
    #[serde(default)]
    pub monitoring: bool,
    /// When these settings were last saved
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Create settings stamped with the current time
    pub fn new(
        source_folder: impl Into<String>,
        destination_folder: impl Into<String>,
        polling_frequency: PollingInterval,
        monitoring: bool,
    ) -> Self {
        Self {
            source_folder: source_folder.into(),
            destination_folder: destination_folder.into(),
            polling_frequency,
            monitoring,
            updated_at: Utc::now(),
        }
    }

    /// Same settings, ignoring the timestamp
    pub fn same_as(&self, other: &Settings) -> bool {
        self.source_folder == other.source_folder
            && self.destination_folder == other.destination_folder
            && self.polling_frequency == other.polling_frequency
            && self.monitoring == other.monitoring
    }
}

/// Trait for settings store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Implementation Guidelines
///
/// - **Async I/O only**: never block the controller task
/// - **Explicit flush**: `flush()` must persist all pending changes
/// - **No business logic**: the store never decides what to save or when
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the last saved settings
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Settings))`: Saved settings
    /// - `Ok(None)`: Nothing saved yet
    /// - `Err(Error)`: Storage error
    async fn load(&self) -> Result<Option<Settings>, crate::Error>;

    /// Save settings, replacing what was there
    async fn save(&self, settings: &Settings) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing settings stores from configuration
#[async_trait]
pub trait SettingsStoreFactory: Send + Sync {
    /// Create a SettingsStore instance from configuration
    async fn create(
        &self,
        config: &crate::config::SettingsStoreConfig,
    ) -> Result<Box<dyn SettingsStore>, crate::Error>;
}
