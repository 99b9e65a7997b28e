//! Plugin-based synchronizer registry
//!
//! The registry lets sync backends and settings stores be registered at
//! runtime, so the daemon builds them from configuration without hardcoded
//! if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use foldersync_core::registry::SyncerRegistry;
//! use foldersync_core::config::SynchronizerConfig;
//!
//! let registry = SyncerRegistry::with_builtin_stores();
//! foldersync_copy::register(&registry);
//!
//! let config = SynchronizerConfig::Copy { skip_unchanged: true };
//! let synchronizer = registry.create_synchronizer(&config)?;
//! ```
//!
//! ## Registration
//!
//! Backend crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &SyncerRegistry) {
//!     registry.register_synchronizer("copy", Box::new(CopySynchronizerFactory));
//! }
//! ```

use crate::config::{SettingsStoreConfig, SynchronizerConfig};
use crate::error::{Error, Result};
use crate::settings::{FileSettingsStoreFactory, MemorySettingsStoreFactory};
use crate::traits::{SettingsStore, SettingsStoreFactory, Synchronizer, SynchronizerFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of synchronizer and settings store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct SyncerRegistry {
    synchronizers: RwLock<HashMap<String, Box<dyn SynchronizerFactory>>>,
    settings_stores: RwLock<HashMap<String, Arc<dyn SettingsStoreFactory>>>,
}

impl SyncerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `file` settings stores registered
    pub fn with_builtin_stores() -> Self {
        let registry = Self::new();
        registry.register_settings_store("memory", Box::new(MemorySettingsStoreFactory));
        registry.register_settings_store("file", Box::new(FileSettingsStoreFactory));
        registry
    }

    /// Register a synchronizer factory under `name`
    pub fn register_synchronizer(
        &self,
        name: impl Into<String>,
        factory: Box<dyn SynchronizerFactory>,
    ) {
        let mut synchronizers = self
            .synchronizers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        synchronizers.insert(name.into(), factory);
    }

    /// Register a settings store factory under `name`
    pub fn register_settings_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn SettingsStoreFactory>,
    ) {
        let mut stores = self
            .settings_stores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a synchronizer from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Synchronizer>)`: Created synchronizer
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_synchronizer(&self, config: &SynchronizerConfig) -> Result<Box<dyn Synchronizer>> {
        let synchronizer_type = config.type_name();
        let synchronizers = self
            .synchronizers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = synchronizers.get(synchronizer_type).ok_or_else(|| {
            Error::config(format!("Unknown synchronizer type: {}", synchronizer_type))
        })?;

        factory.create(config)
    }

    /// Create a settings store from configuration
    pub async fn create_settings_store(
        &self,
        config: &SettingsStoreConfig,
    ) -> Result<Box<dyn SettingsStore>> {
        let store_type = config.type_name();

        // Release the lock before awaiting the factory
        let factory = {
            let stores = self
                .settings_stores
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            stores.get(store_type).cloned().ok_or_else(|| {
                Error::config(format!("Unknown settings store type: {}", store_type))
            })?
        };

        factory.create(config).await
    }

    /// List all registered synchronizer types
    pub fn list_synchronizers(&self) -> Vec<String> {
        let synchronizers = self
            .synchronizers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        synchronizers.keys().cloned().collect()
    }

    /// Check if a synchronizer type is registered
    pub fn has_synchronizer(&self, name: &str) -> bool {
        let synchronizers = self
            .synchronizers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        synchronizers.contains_key(name)
    }

    /// Check if a settings store type is registered
    pub fn has_settings_store(&self, name: &str) -> bool {
        let stores = self
            .settings_stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.contains_key(name)
    }
}
