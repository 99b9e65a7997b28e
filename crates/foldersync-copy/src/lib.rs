// # Copy Synchronizer
//
// This crate provides a recursive-copy synchronizer for the folder sync
// system.
//
// ## Behavior
//
// One pass mirrors the source tree into the destination:
// - The source folder must exist and be a folder
// - The destination is created if missing
// - A destination equal to, or inside, the source is rejected
// - Directories are created, files are copied
// - With `skip_unchanged`, files whose destination copy has the same size and
//   is not older are left alone
//
// Files that exist only in the destination are kept. Symlinks are not
// followed.
//
// ## Architecture
//
// The tree is walked with `walkdir` on the blocking pool, then copied with
// `tokio::fs` so the runtime is never blocked.

use foldersync_core::SyncerRegistry;
use foldersync_core::config::SynchronizerConfig;
use foldersync_core::traits::{SyncReport, Synchronizer, SynchronizerFactory};
use foldersync_core::{Error, Result};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Errors raised while planning or performing a copy pass
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Source folder does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Source is not a folder: {}", .0.display())]
    SourceNotAFolder(PathBuf),

    #[error(
        "Destination {} is inside the source folder {}",
        .destination.display(),
        .source_folder.display()
    )]
    DestinationInsideSource {
        source_folder: PathBuf,
        destination: PathBuf,
    },

    #[error("Failed to read source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Source walk was interrupted: {0}")]
    Interrupted(String),
}

impl From<CopyError> for Error {
    fn from(err: CopyError) -> Self {
        Error::sync_failure(err.to_string())
    }
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> CopyError {
    let path = path.to_path_buf();
    move |source| CopyError::Io {
        action,
        path,
        source,
    }
}

/// One entry of the source tree, relative to the source root
#[derive(Debug)]
enum Entry {
    Folder(PathBuf),
    File {
        relative: PathBuf,
        len: u64,
        modified: Option<SystemTime>,
    },
}

/// Recursive copy synchronizer
///
/// # Example
///
/// ```rust,no_run
/// use foldersync_copy::CopySynchronizer;
/// use foldersync_core::Synchronizer;
///
/// # async fn example() -> foldersync_core::Result<()> {
/// let synchronizer = CopySynchronizer::new();
/// let report = synchronizer
///     .synchronize("/home/me/Documents", "/mnt/backup/Documents")
///     .await?;
/// println!("{} files copied", report.files_copied);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CopySynchronizer {
    /// Leave files alone when the destination copy looks current
    skip_unchanged: bool,
}

impl CopySynchronizer {
    /// Create a copy synchronizer that skips unchanged files
    pub fn new() -> Self {
        Self {
            skip_unchanged: true,
        }
    }

    /// Create with an explicit skip policy
    ///
    /// # Parameters
    ///
    /// - `skip_unchanged`: When `false`, every file is copied on every pass
    pub fn with_skip_unchanged(skip_unchanged: bool) -> Self {
        Self { skip_unchanged }
    }

    async fn run(&self, source: &Path, destination: &Path) -> std::result::Result<SyncReport, CopyError> {
        let (source_folder, destination) = (source.to_path_buf(), destination.to_path_buf());
        let (entries, destination) = tokio::task::spawn_blocking(move || {
            let destination = check_destination(&source_folder, destination)?;
            let entries = walk(&source_folder)?;
            Ok::<_, CopyError>((entries, destination))
        })
        .await
        .map_err(|e| CopyError::Interrupted(e.to_string()))??;

        let mut report = SyncReport::new();

        if fs::metadata(&destination).await.is_err() {
            fs::create_dir_all(&destination)
                .await
                .map_err(io_error("Failed to create", &destination))?;
            report.directories_created += 1;
            debug!("Created destination folder {}", destination.display());
        }

        for entry in entries {
            match entry {
                Entry::Folder(relative) => {
                    let target = destination.join(&relative);
                    if fs::metadata(&target).await.is_err() {
                        fs::create_dir_all(&target)
                            .await
                            .map_err(io_error("Failed to create", &target))?;
                        report.directories_created += 1;
                    }
                }
                Entry::File {
                    relative,
                    len,
                    modified,
                } => {
                    let target = destination.join(&relative);
                    if self.skip_unchanged && is_current(&target, len, modified).await {
                        trace!("Unchanged: {}", relative.display());
                        report.files_skipped += 1;
                        continue;
                    }

                    if let Some(parent) = target.parent()
                        && fs::metadata(parent).await.is_err()
                    {
                        fs::create_dir_all(parent)
                            .await
                            .map_err(io_error("Failed to create", parent))?;
                        report.directories_created += 1;
                    }

                    let from = source.join(&relative);
                    let copied = fs::copy(&from, &target)
                        .await
                        .map_err(io_error("Failed to copy", &from))?;
                    trace!("Copied {} ({} bytes)", relative.display(), copied);
                    report.files_copied += 1;
                    report.bytes_copied += copied;
                }
            }
        }

        report.finished_at = chrono::Utc::now();
        Ok(report)
    }
}

impl Default for CopySynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Synchronizer for CopySynchronizer {
    async fn synchronize(&self, source: &str, destination: &str) -> Result<SyncReport> {
        info!("Copying '{}' into '{}'", source, destination);

        let report = self.run(Path::new(source), Path::new(destination)).await?;

        info!(
            "Copy finished: {} copied, {} unchanged, {} folders created, {} bytes",
            report.files_copied,
            report.files_skipped,
            report.directories_created,
            report.bytes_copied
        );
        Ok(report)
    }

    fn synchronizer_name(&self) -> &'static str {
        "copy"
    }
}

/// Reject a destination equal to or inside the source
///
/// Returns the destination resolved against the nearest existing ancestor.
fn check_destination(source: &Path, destination: PathBuf) -> std::result::Result<PathBuf, CopyError> {
    let metadata = match std::fs::metadata(source) {
        Ok(metadata) => metadata,
        Err(_) => return Err(CopyError::SourceMissing(source.to_path_buf())),
    };
    if !metadata.is_dir() {
        return Err(CopyError::SourceNotAFolder(source.to_path_buf()));
    }

    let source_folder = source
        .canonicalize()
        .map_err(io_error("Failed to resolve", source))?;
    let resolved = resolve(&destination)?;

    if resolved.starts_with(&source_folder) {
        return Err(CopyError::DestinationInsideSource {
            source_folder,
            destination,
        });
    }

    Ok(resolved)
}

/// Canonicalize the longest existing prefix of `path` and append the rest
fn resolve(path: &Path) -> std::result::Result<PathBuf, CopyError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(io_error("Failed to resolve", path))?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(io_error("Failed to resolve", existing))?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn walk(source: &Path) -> std::result::Result<Vec<Entry>, CopyError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => continue,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            entries.push(Entry::Folder(relative));
        } else if file_type.is_file() {
            let metadata = entry.metadata()?;
            entries.push(Entry::File {
                relative,
                len: metadata.len(),
                modified: metadata.modified().ok(),
            });
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }

    Ok(entries)
}

/// Destination copy has the same size and is not older than the source
async fn is_current(target: &Path, len: u64, modified: Option<SystemTime>) -> bool {
    let Ok(existing) = fs::metadata(target).await else {
        return false;
    };
    if !existing.is_file() || existing.len() != len {
        return false;
    }

    match (existing.modified().ok(), modified) {
        (Some(target_modified), Some(source_modified)) => target_modified >= source_modified,
        _ => false,
    }
}

/// Factory for creating copy synchronizers
pub struct CopySynchronizerFactory;

impl SynchronizerFactory for CopySynchronizerFactory {
    fn create(&self, config: &SynchronizerConfig) -> Result<Box<dyn Synchronizer>> {
        match config {
            SynchronizerConfig::Copy { skip_unchanged } => {
                Ok(Box::new(CopySynchronizer::with_skip_unchanged(*skip_unchanged)))
            }
            other => Err(Error::config(format!(
                "Copy synchronizer cannot be built from '{}' configuration",
                other.type_name()
            ))),
        }
    }
}

/// Register the copy synchronizer with a registry
pub fn register(registry: &SyncerRegistry) {
    registry.register_synchronizer("copy", Box::new(CopySynchronizerFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    fn as_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[tokio::test]
    async fn test_copies_the_tree() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("backup");
        write(&source.join("a.txt"), "hello");
        write(&source.join("nested/deeper/b.txt"), "world!");
        std::fs::create_dir_all(source.join("empty")).unwrap();

        let report = CopySynchronizer::new()
            .synchronize(as_str(&source), as_str(&destination))
            .await
            .unwrap();

        assert_eq!(report.files_copied, 2);
        assert_eq!(report.files_skipped, 0);
        assert_eq!(report.bytes_copied, 11);
        // backup, nested, nested/deeper, empty
        assert_eq!(report.directories_created, 4);

        assert_eq!(
            std::fs::read_to_string(destination.join("nested/deeper/b.txt")).unwrap(),
            "world!"
        );
        assert!(destination.join("empty").is_dir());
    }

    #[tokio::test]
    async fn test_second_pass_skips_unchanged_files() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("backup");
        write(&source.join("a.txt"), "hello");
        write(&source.join("b.txt"), "world");

        let synchronizer = CopySynchronizer::new();
        synchronizer
            .synchronize(as_str(&source), as_str(&destination))
            .await
            .unwrap();

        write(&source.join("b.txt"), "world, again");
        let report = synchronizer
            .synchronize(as_str(&source), as_str(&destination))
            .await
            .unwrap();

        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_copied, 1);
        assert_eq!(
            std::fs::read_to_string(destination.join("b.txt")).unwrap(),
            "world, again"
        );
    }

    #[tokio::test]
    async fn test_copy_everything_when_not_skipping() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("backup");
        write(&source.join("a.txt"), "hello");

        let synchronizer = CopySynchronizer::with_skip_unchanged(false);
        for _ in 0..2 {
            let report = synchronizer
                .synchronize(as_str(&source), as_str(&destination))
                .await
                .unwrap();
            assert_eq!(report.files_copied, 1);
            assert_eq!(report.files_skipped, 0);
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_a_sync_failure() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("nope");
        let destination = dir.path().join("backup");

        let err = CopySynchronizer::new()
            .synchronize(as_str(&source), as_str(&destination))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SyncFailure(ref reason) if reason.contains("does not exist")));
        assert!(!destination.exists(), "nothing is created for a failed pass");
    }

    #[tokio::test]
    async fn test_destination_inside_source_is_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        write(&source.join("a.txt"), "hello");

        for destination in [source.join("backup"), source.clone()] {
            let err = CopySynchronizer::new()
                .synchronize(as_str(&source), as_str(&destination))
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::SyncFailure(ref reason) if reason.contains("inside the source")),
                "got {:?}",
                err
            );
        }
        assert!(!source.join("backup").exists());
    }

    #[tokio::test]
    async fn test_files_only_in_destination_are_kept() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("backup");
        write(&source.join("a.txt"), "hello");
        write(&destination.join("extra.txt"), "mine");

        CopySynchronizer::new()
            .synchronize(as_str(&source), as_str(&destination))
            .await
            .unwrap();

        assert!(destination.join("a.txt").exists());
        assert!(destination.join("extra.txt").exists());
    }

    #[test]
    fn test_factory_creation() {
        let factory = CopySynchronizerFactory;

        let config = SynchronizerConfig::Copy {
            skip_unchanged: false,
        };
        let synchronizer = factory.create(&config).unwrap();
        assert_eq!(synchronizer.synchronizer_name(), "copy");

        let custom = SynchronizerConfig::Custom {
            factory: "other".to_string(),
            config: serde_json::json!({}),
        };
        assert!(matches!(factory.create(&custom), Err(Error::Config(_))));
    }

    #[test]
    fn test_register() {
        let registry = SyncerRegistry::new();
        register(&registry);
        assert!(registry.has_synchronizer("copy"));

        let synchronizer = registry
            .create_synchronizer(&SynchronizerConfig::default())
            .unwrap();
        assert_eq!(synchronizer.synchronizer_name(), "copy");
    }
}
