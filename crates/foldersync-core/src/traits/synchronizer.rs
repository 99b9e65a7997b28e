// # Synchronizer Trait
//
// Defines the single operation the controller needs from a sync backend:
// make the destination match the source, once.
//
// ## Implementations
//
// - Recursive copy: `foldersync-copy` crate
// - Future: rsync-style delta transfer, remote targets
//
// ## Usage
//
// ```rust,ignore
// use foldersync_core::Synchronizer;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let synchronizer = /* Synchronizer implementation */;
//
//     let report = synchronizer
//         .synchronize("/home/me/Documents", "/mnt/backup/Documents")
//         .await?;
//     println!("copied {} files", report.files_copied);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a successful synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Files written to the destination
    pub files_copied: usize,
    /// Files left alone because the destination was already current
    pub files_skipped: usize,
    /// Directories created in the destination
    pub directories_created: usize,
    /// Total bytes written
    pub bytes_copied: u64,
    /// When the synchronization finished
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// An empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            files_copied: 0,
            files_skipped: 0,
            directories_created: 0,
            bytes_copied: 0,
            finished_at: Utc::now(),
        }
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for sync backends
///
/// The controller treats the backend as an opaque capability: it hands over
/// two folder paths and waits for success or a displayable failure.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. Each call runs on its own task.
///
/// # Contract
///
/// - One call performs one complete pass. No scheduling, retrying or
///   looping: recurrence is owned by the controller's monitoring timer.
/// - Calls may take arbitrarily long. The controller imposes no timeout and
///   stays in `syncing` until the call resolves.
/// - The controller never overlaps two calls, so implementations need no
///   locking against themselves.
/// - A failure is reported as an `Err`; its [`crate::Error::failure_reason`]
///   is what the user sees.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    /// Make `destination` mirror `source`
    ///
    /// # Parameters
    ///
    /// - `source`: Folder to read from (non-empty)
    /// - `destination`: Folder to write into (non-empty)
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: The pass completed
    /// - `Err(Error)`: The pass failed; usually `Error::SyncFailure`
    async fn synchronize(&self, source: &str, destination: &str)
    -> Result<SyncReport, crate::Error>;

    /// Get the synchronizer name (for logging/debugging)
    fn synchronizer_name(&self) -> &'static str;
}

/// Helper trait for constructing synchronizers from configuration
pub trait SynchronizerFactory: Send + Sync {
    /// Create a Synchronizer instance from configuration
    fn create(
        &self,
        config: &crate::config::SynchronizerConfig,
    ) -> Result<Box<dyn Synchronizer>, crate::Error>;
}
