// # Memory Settings Store
//
// In-memory implementation of SettingsStore.
//
// Nothing survives a restart: the controller starts with empty folders and
// monitoring off every time. Useful for tests and one-shot runs where the
// selection comes from the environment anyway.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::SettingsStoreConfig;
use crate::traits::settings_store::{Settings, SettingsStore, SettingsStoreFactory};

/// In-memory settings store implementation
///
/// # Example
///
/// ```rust,no_run
/// use foldersync_core::config::PollingInterval;
/// use foldersync_core::settings::MemorySettingsStore;
/// use foldersync_core::traits::{Settings, SettingsStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySettingsStore::new();
///
///     let settings = Settings::new("/src", "/dst", PollingInterval::default(), true);
///     store.save(&settings).await?;
///
///     assert_eq!(store.load().await?, Some(settings));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<Option<Settings>>>,
}

impl MemorySettingsStore {
    /// Create an empty memory settings store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `settings`
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(settings))),
        }
    }

    /// Forget the saved settings
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<Settings>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<(), Error> {
        *self.inner.write().await = Some(settings.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for [`MemorySettingsStore`]
pub struct MemorySettingsStoreFactory;

#[async_trait]
impl SettingsStoreFactory for MemorySettingsStoreFactory {
    async fn create(&self, _config: &SettingsStoreConfig) -> Result<Box<dyn SettingsStore>, Error> {
        Ok(Box::new(MemorySettingsStore::new()))
    }
}
