//! Core traits for the folder sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Synchronizer`]: Perform one synchronization of source into destination
//! - [`MonitorSession`]: Optional stateful monitoring session on the backend side
//! - [`SettingsStore`]: Persistent storage of the user's selections

pub mod synchronizer;
pub mod monitor_session;
pub mod settings_store;

pub use synchronizer::{Synchronizer, SyncReport, SynchronizerFactory};
pub use monitor_session::{MonitorSession, LocalSession};
pub use settings_store::{SettingsStore, Settings, SettingsStoreFactory};
