// # File Settings Store
//
// File-based implementation of SettingsStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good settings
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "settings": {
//     "source_folder": "/home/me/Documents",
//     "destination_folder": "/mnt/backup/Documents",
//     "polling_frequency": 5,
//     "monitoring": true,
//     "updated_at": "2025-01-09T12:00:00Z"
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::SettingsStoreConfig;
use crate::traits::settings_store::{Settings, SettingsStore, SettingsStoreFactory};

/// Settings file format version
const SETTINGS_FILE_VERSION: &str = "1.0";

/// File-based settings store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use foldersync_core::settings::FileSettingsStore;
/// use foldersync_core::traits::SettingsStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSettingsStore::new("/var/lib/foldersync/settings.json").await?;
///     let saved = store.load().await?;
///     println!("{saved:?}");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    settings: Option<Settings>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SettingsFileFormat {
    version: String,
    settings: Option<Settings>,
}

impl FileSettingsStore {
    /// Create or load a file settings store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing settings file
    /// 3. If it is corrupted, try the backup
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create settings directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let settings = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                settings,
                dirty: false,
            })),
        })
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<Option<Settings>, Error> {
        match Self::load_file(path).await {
            Ok(settings) => Ok(settings),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Settings file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty settings.");
                    return Ok(None);
                }

                match Self::load_file(&backup_path).await {
                    Ok(settings) => {
                        tracing::info!("Recovered settings from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore settings file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(settings)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with empty settings.",
                            backup_err
                        );
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_file(path: &Path) -> Result<Option<Settings>, Error> {
        if !path.exists() {
            tracing::debug!("Settings file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::settings_store(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: SettingsFileFormat = serde_json::from_str(&content)?;

        if file.version != SETTINGS_FILE_VERSION {
            tracing::warn!(
                "Settings file version mismatch: expected {}, got {}. Attempting to load anyway.",
                SETTINGS_FILE_VERSION,
                file.version
            );
        }

        Ok(file.settings)
    }

    /// Write settings to file atomically
    async fn write_settings(&self) -> Result<(), Error> {
        let json = {
            let state = self.state.read().await;
            let file = SettingsFileFormat {
                version: SETTINGS_FILE_VERSION.to_string(),
                settings: state.settings.clone(),
            };
            serde_json::to_string_pretty(&file)?
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::settings_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::settings_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::settings_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create settings backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::settings_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        self.state.write().await.dirty = false;

        tracing::trace!("Settings written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<Option<Settings>, Error> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            state.settings = Some(settings.clone());
            state.dirty = true;
        }

        // Immediate write for durability
        self.write_settings().await
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty {
            self.write_settings().await
        } else {
            Ok(())
        }
    }
}

/// Factory for [`FileSettingsStore`]
pub struct FileSettingsStoreFactory;

#[async_trait]
impl SettingsStoreFactory for FileSettingsStoreFactory {
    async fn create(&self, config: &SettingsStoreConfig) -> Result<Box<dyn SettingsStore>, Error> {
        match config {
            SettingsStoreConfig::File { path } => Ok(Box::new(FileSettingsStore::new(path).await?)),
            other => Err(Error::config(format!(
                "File settings store cannot be built from '{}' configuration",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollingInterval;
    use tempfile::tempdir;

    fn settings(source: &str, secs: u64) -> Settings {
        Settings::new(source, "/dst", PollingInterval::new(secs).unwrap(), true)
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = FileSettingsStore::new(&path).await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);

        let saved = settings("/src", 10);
        store.save(&saved).await.unwrap();
        assert!(path.exists());

        let reopened = FileSettingsStore::new(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("settings.json");

        let store = FileSettingsStore::new(&path).await.unwrap();
        store.save(&settings("/src", 5)).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = FileSettingsStore::new(&path).await.unwrap();
        let first = settings("/first", 5);
        store.save(&first).await.unwrap();
        // Second write moves the first one into the backup
        store.save(&settings("/second", 7)).await.unwrap();

        let backup_path = FileSettingsStore::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileSettingsStore::new(&path).await.unwrap();
        assert_eq!(
            recovered.load().await.unwrap(),
            Some(first),
            "Backup should contain previous settings, not latest"
        );
    }

    #[tokio::test]
    async fn test_file_store_corruption_without_backup_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{ not json").await.unwrap();

        let store = FileSettingsStore::new(&path).await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_factory_rejects_other_config() {
        let result = FileSettingsStoreFactory
            .create(&SettingsStoreConfig::Memory)
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
