//! Configuration types for the folder sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main folder sync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderSyncConfig {
    /// Synchronizer backend configuration
    #[serde(default)]
    pub synchronizer: SynchronizerConfig,

    /// Settings store configuration
    #[serde(default)]
    pub settings_store: SettingsStoreConfig,

    /// Controller settings
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl FolderSyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.synchronizer.validate()?;
        self.settings_store.validate()?;
        self.controller.validate()?;

        Ok(())
    }
}

/// Seconds between automatic synchronizations, always within `[1, 60]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PollingInterval(u64);

impl PollingInterval {
    /// Smallest accepted interval in seconds
    pub const MIN_SECS: u64 = 1;

    /// Largest accepted interval in seconds
    pub const MAX_SECS: u64 = 60;

    /// Interval used when nothing else is configured
    pub const DEFAULT_SECS: u64 = 5;

    /// Validate and wrap a number of seconds
    pub fn new(secs: u64) -> Result<Self, crate::Error> {
        if (Self::MIN_SECS..=Self::MAX_SECS).contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(crate::Error::FrequencyOutOfRange(secs))
        }
    }

    /// The interval in whole seconds
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// The interval as a [`Duration`]
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for PollingInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl TryFrom<u64> for PollingInterval {
    type Error = crate::Error;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::new(secs)
    }
}

impl From<PollingInterval> for u64 {
    fn from(interval: PollingInterval) -> Self {
        interval.0
    }
}

impl std::fmt::Display for PollingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Synchronizer backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynchronizerConfig {
    /// Recursive copy of the source tree into the destination
    Copy {
        /// Skip files whose destination copy is the same size and not older
        #[serde(default = "default_skip_unchanged")]
        skip_unchanged: bool,
    },

    /// Custom synchronizer
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SynchronizerConfig {
    /// Validate the synchronizer configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SynchronizerConfig::Copy { .. } => Ok(()),
            SynchronizerConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom synchronizer factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom synchronizer config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the synchronizer type name
    pub fn type_name(&self) -> &str {
        match self {
            SynchronizerConfig::Copy { .. } => "copy",
            SynchronizerConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        SynchronizerConfig::Copy {
            skip_unchanged: default_skip_unchanged(),
        }
    }
}

fn default_skip_unchanged() -> bool {
    true
}

/// Settings store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingsStoreConfig {
    /// File-based settings store
    File {
        /// Path to the settings file
        path: String,
    },

    /// In-memory settings store (not persistent)
    #[default]
    Memory,

    /// Custom settings store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SettingsStoreConfig {
    /// Validate the settings store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SettingsStoreConfig::File { path } if path.is_empty() => Err(crate::Error::config(
                "Settings file path cannot be empty",
            )),
            SettingsStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom settings store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the settings store type name
    pub fn type_name(&self) -> &str {
        match self {
            SettingsStoreConfig::File { .. } => "file",
            SettingsStoreConfig::Memory => "memory",
            SettingsStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Polling interval used until the user picks one (in seconds)
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: u64,

    /// Capacity of the outgoing event channel
    ///
    /// When full, new events are dropped (with a warning log) so a slow
    /// consumer never stalls the controller.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the incoming command channel
    #[serde(default = "default_command_channel_capacity")]
    pub command_channel_capacity: usize,

    /// Whether to load persisted settings when the controller starts
    #[serde(default = "default_restore_settings")]
    pub restore_settings: bool,
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        PollingInterval::new(self.default_interval_secs).map_err(|_| {
            crate::Error::config(format!(
                "Default polling interval must be between {} and {} seconds, got {}",
                PollingInterval::MIN_SECS,
                PollingInterval::MAX_SECS,
                self.default_interval_secs
            ))
        })?;

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.command_channel_capacity == 0 {
            return Err(crate::Error::config("Command channel capacity must be > 0"));
        }

        Ok(())
    }

    /// The validated default polling interval
    pub fn default_interval(&self) -> PollingInterval {
        PollingInterval::new(self.default_interval_secs).unwrap_or_default()
    }

    /// Set the default polling interval
    pub fn with_default_interval_secs(mut self, secs: u64) -> Self {
        self.default_interval_secs = secs;
        self
    }

    /// Enable or disable settings restoration at startup
    pub fn with_restore_settings(mut self, restore: bool) -> Self {
        self.restore_settings = restore;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: default_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            command_channel_capacity: default_command_channel_capacity(),
            restore_settings: default_restore_settings(),
        }
    }
}

fn default_interval_secs() -> u64 {
    PollingInterval::DEFAULT_SECS
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_command_channel_capacity() -> usize {
    64
}

fn default_restore_settings() -> bool {
    true
}
