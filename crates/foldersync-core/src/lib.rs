// # foldersync-core
//
// Core library for the folder sync monitoring controller.
//
// ## Architecture Overview
//
// This library keeps a destination folder in sync with a source folder, either
// on demand or on a recurring timer:
// - **Synchronizer**: Trait for performing one synchronization pass
// - **MonitorSession**: Optional backend-side monitoring session
// - **SettingsStore**: Trait for persisting the user's selections
// - **SyncController**: Actor that owns the selection, status and timer
// - **SyncerRegistry**: Plugin-based registry for sync backends
//
// ## Design Principles
//
// 1. **Single Owner**: All mutable state lives in one controller task
// 2. **Derived Status**: Status is recomputed from state, never set by hand
// 3. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **At Most One Sync**: A second request while one is running is rejected

pub mod config;
pub mod controller;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod selection;
pub mod settings;
pub mod status;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    ControllerConfig, FolderSyncConfig, PollingInterval, SettingsStoreConfig, SynchronizerConfig,
};
pub use controller::{
    ControllerEvent, ControllerHandle, ControllerSnapshot, MonitoringMode, SyncController,
};
pub use error::{Error, Result};
pub use monitor::SyncTrigger;
pub use registry::SyncerRegistry;
pub use selection::{FolderRole, FolderSelection};
pub use settings::{FileSettingsStore, MemorySettingsStore};
pub use status::{Status, StatusMachine, SyncOutcome, derive_status};
pub use traits::{LocalSession, MonitorSession, SettingsStore, SyncReport, Synchronizer};
