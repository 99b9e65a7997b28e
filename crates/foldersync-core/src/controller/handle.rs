//! Cloneable front end of the controller task
//!
//! Every method sends one [`Command`] and waits for the controller to answer.
//! Commands are processed strictly in order, one at a time.

use tokio::sync::{mpsc, oneshot};

use crate::controller::{ControllerSnapshot, MonitoringMode};
use crate::error::{Error, Result};
use crate::selection::FolderRole;
use crate::status::Status;
use crate::traits::SyncReport;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests handled by the controller task
#[derive(Debug)]
pub(crate) enum Command {
    SetFolder {
        role: FolderRole,
        path: String,
        reply: Reply<()>,
    },
    SetMonitoring {
        enabled: bool,
        /// Reject with `InvalidConfiguration` instead of deferring
        require_ready: bool,
        reply: Reply<MonitoringMode>,
    },
    SetPollingFrequency {
        secs: u64,
        reply: Reply<()>,
    },
    SyncNow {
        reply: Reply<SyncReport>,
    },
    Snapshot {
        reply: oneshot::Sender<ControllerSnapshot>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Handle used by the UI (or any other caller) to drive a [`SyncController`]
///
/// Handles are cheap to clone. Once the controller has stopped every call
/// fails with [`Error::ControllerStopped`], except [`shutdown`](Self::shutdown)
/// which stays `Ok`.
///
/// [`SyncController`]: crate::controller::SyncController
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
}

impl ControllerHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    /// Select the source folder; an empty path clears it
    pub async fn set_source_folder(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request(|reply| Command::SetFolder {
            role: FolderRole::Source,
            path,
            reply,
        })
        .await?
    }

    /// Select the destination folder; an empty path clears it
    pub async fn set_destination_folder(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request(|reply| Command::SetFolder {
            role: FolderRole::Destination,
            path,
            reply,
        })
        .await?
    }

    /// Turn monitoring on or off
    ///
    /// Enabling while a folder is missing records the intent and returns
    /// [`MonitoringMode::Pending`]; monitoring starts by itself once both
    /// folders are selected.
    pub async fn set_monitoring(&self, enabled: bool) -> Result<MonitoringMode> {
        self.request(|reply| Command::SetMonitoring {
            enabled,
            require_ready: false,
            reply,
        })
        .await?
    }

    /// Start monitoring now
    ///
    /// Unlike `set_monitoring(true)` this fails with
    /// [`Error::InvalidConfiguration`] when a folder is missing.
    pub async fn start(&self) -> Result<MonitoringMode> {
        self.request(|reply| Command::SetMonitoring {
            enabled: true,
            require_ready: true,
            reply,
        })
        .await?
    }

    /// Change the polling frequency, in seconds (1-60)
    pub async fn set_polling_frequency(&self, secs: u64) -> Result<()> {
        self.request(|reply| Command::SetPollingFrequency { secs, reply })
            .await?
    }

    /// Run one synchronization and wait for its result
    pub async fn sync_now(&self) -> Result<SyncReport> {
        self.request(|reply| Command::SyncNow { reply }).await?
    }

    /// Current status
    pub async fn current_status(&self) -> Result<Status> {
        Ok(self.snapshot().await?.status)
    }

    /// Read-only view of the controller state
    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the controller
    ///
    /// Returns the result of the final settings flush. Calling it again, or
    /// after the controller is gone, returns `Ok(())`.
    pub async fn shutdown(&self) -> Result<()> {
        match self.request(|reply| Command::Shutdown { reply }).await {
            Ok(flushed) => flushed,
            Err(Error::ControllerStopped) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether the controller task has stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::ControllerStopped)?;
        response.await.map_err(|_| Error::ControllerStopped)
    }
}
