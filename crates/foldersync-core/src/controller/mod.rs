//! Sync monitoring controller
//!
//! The SyncController is responsible for:
//! - Holding the folder selection and the user's monitoring intent
//! - Deriving the status after every change
//! - Driving the synchronizer manually, on activation and on every timer fire
//! - Persisting settings after each accepted change
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ ControllerHandle │─── Command ───┐
//! └──────────────────┘               │
//!                                    ▼
//!                          ┌────────────────┐
//!           timer fire ───▶│ SyncController │◀─── sync finished
//!                          └────────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌───────────────┐         ┌───────────────┐          ┌───────────────┐
//! │ Synchronizer  │         │ SettingsStore │          │    Events     │
//! │ (spawned)     │         │ (save/flush)  │          │   (notify)    │
//! └───────────────┘         └───────────────┘          └───────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. A command, a timer fire or a sync completion arrives
//! 2. The selection, outcome or monitoring intent is updated
//! 3. Status is recomputed from the new state
//! 4. Monitoring is reconciled with readiness
//! 5. Settings are saved and events are emitted

mod handle;

pub use handle::ControllerHandle;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ControllerConfig, PollingInterval};
use crate::error::{Error, Result};
use crate::monitor::{
    Activity, FinishedSync, MonitoringLifecycle, SyncTicket, SyncTrigger, TimerChange,
};
use crate::selection::{FolderRole, FolderSelection};
use crate::status::{Status, StatusMachine, StatusTransition};
use crate::traits::{
    LocalSession, MonitorSession, Settings, SettingsStore, SyncReport, Synchronizer,
};
use handle::Command;

/// Events emitted by the SyncController
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Status changed
    StatusChanged { from: Status, to: Status },

    /// A synchronize call was dispatched
    SyncStarted { trigger: SyncTrigger },

    /// A synchronize call succeeded
    SyncSucceeded {
        trigger: SyncTrigger,
        report: SyncReport,
    },

    /// A synchronize call failed
    SyncFailed { trigger: SyncTrigger, reason: String },

    /// A synchronize request was not dispatched
    SyncSkipped { trigger: SyncTrigger, reason: String },

    /// The monitoring timer was created
    MonitoringStarted { interval_secs: u64 },

    /// The monitoring timer was dropped
    MonitoringStopped,

    /// Monitoring is wanted but waits for both folders
    MonitoringDeferred,

    /// The monitor session refused to start
    MonitoringStartFailed { reason: String },

    /// Polling frequency changed
    IntervalChanged { interval_secs: u64 },

    /// Controller stopped
    Stopped { reason: String },
}

/// Result of a monitoring request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringMode {
    /// The timer is running
    Active,
    /// Enabled, waiting for both folders
    Pending,
    /// Disabled
    Off,
}

/// Read-only view of the controller state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub status: Status,
    /// Reason of the last failed sync while the status is `error`
    pub last_error: Option<String>,
    /// Monitoring intent
    pub is_monitoring: bool,
    /// Whether the recurring timer exists
    pub monitoring_active: bool,
    pub polling_frequency_secs: u64,
    pub source_folder: String,
    pub destination_folder: String,
    /// Finish time of the last successful sync
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Sync monitoring controller
///
/// The controller owns all mutable state and runs as a single task; callers
/// talk to it through a [`ControllerHandle`].
///
/// ## Lifecycle
///
/// 1. Create with [`SyncController::new()`]
/// 2. Optionally attach a [`MonitorSession`] with [`SyncController::with_session()`]
/// 3. Run with [`SyncController::run()`] (or [`SyncController::spawn()`])
/// 4. Stop with [`ControllerHandle::shutdown()`], or by dropping every handle
///
/// ## Concurrency
///
/// Commands are handled one at a time, in order. The synchronize call runs on
/// its own task so commands keep flowing while it is in flight, but at most
/// one call is ever outstanding: a second request is rejected, never queued.
///
/// ## Load Resistance
///
/// - **Bounded event channel**: when full, events are dropped with a warning
/// - **Skipped fires**: a timer fire during an in-flight sync is skipped
pub struct SyncController {
    /// Backend doing the actual work
    synchronizer: Arc<dyn Synchronizer>,

    /// Persisted user choices
    settings: Box<dyn SettingsStore>,

    selection: FolderSelection,

    status: StatusMachine,

    /// Timer and in-flight call
    monitor: MonitoringLifecycle,

    last_synced_at: Option<DateTime<Utc>>,

    /// Load settings before accepting commands
    restore_settings: bool,

    commands: mpsc::Receiver<Command>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ControllerEvent>,
}

impl SyncController {
    /// Create a new controller
    ///
    /// # Parameters
    ///
    /// - `synchronizer`: Sync backend
    /// - `settings`: Settings store
    /// - `config`: Controller configuration
    ///
    /// # Returns
    ///
    /// A tuple of (controller, handle, event_receiver)
    pub fn new(
        synchronizer: Box<dyn Synchronizer>,
        settings: Box<dyn SettingsStore>,
        config: ControllerConfig,
    ) -> Result<(Self, ControllerHandle, mpsc::Receiver<ControllerEvent>)> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);

        let controller = Self {
            synchronizer: Arc::from(synchronizer),
            settings,
            selection: FolderSelection::new(),
            status: StatusMachine::new(),
            monitor: MonitoringLifecycle::new(Box::new(LocalSession), config.default_interval()),
            last_synced_at: None,
            restore_settings: config.restore_settings,
            commands: command_rx,
            event_tx,
        };

        Ok((controller, ControllerHandle::new(command_tx), event_rx))
    }

    /// Use `session` for backend-side monitoring state
    pub fn with_session(mut self, session: Box<dyn MonitorSession>) -> Self {
        self.monitor = MonitoringLifecycle::new(session, self.monitor.interval());
        self
    }

    /// Run the controller on a new task
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Run the controller
    ///
    /// Restores saved settings (when configured), then processes commands,
    /// timer fires and sync completions until shutdown is requested or every
    /// handle is dropped.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The final settings flush failed
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Sync controller started (synchronizer: {})",
            self.synchronizer.synchronizer_name()
        );

        if self.restore_settings {
            self.restore().await;
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let flushed = self.shutdown("Shutdown requested").await;
                        let _ = reply.send(match &flushed {
                            Ok(()) => Ok(()),
                            Err(e) => Err(Error::Other(e.to_string())),
                        });
                        return flushed;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => return self.shutdown("All controller handles dropped").await,
                },

                activity = self.monitor.next_activity() => match activity {
                    Activity::Fire => self.on_timer_fire(),
                    Activity::Finished(finished) => self.on_sync_finished(finished),
                },
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetFolder { role, path, reply } => {
                let result = self.set_folder(role, path).await;
                let _ = reply.send(result);
            }
            Command::SetMonitoring {
                enabled,
                require_ready,
                reply,
            } => {
                let result = self.set_monitoring(enabled, require_ready).await;
                let _ = reply.send(result);
            }
            Command::SetPollingFrequency { secs, reply } => {
                let result = self.set_polling_frequency(secs).await;
                let _ = reply.send(result);
            }
            Command::SyncNow { reply } => match self.begin_sync(SyncTrigger::Manual) {
                Ok(()) => self.dispatch_sync(SyncTrigger::Manual, Some(reply)),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn set_folder(&mut self, role: FolderRole, path: String) -> Result<()> {
        if !self.selection.set(role, path) {
            debug!("{} folder unchanged", role);
            return Ok(());
        }
        info!("{} folder set to '{}'", role, self.selection.path(role));

        if let Some(transition) = self.status.selection_changed(&self.selection) {
            self.emit_status(transition);
        }

        if let Err(e) = self.reconcile_monitoring().await {
            warn!("Monitoring could not follow the folder change: {}", e);
        }

        self.persist_settings().await;
        Ok(())
    }

    async fn set_monitoring(&mut self, enabled: bool, require_ready: bool) -> Result<MonitoringMode> {
        if enabled && require_ready {
            self.selection.require_ready()?;
        }

        self.monitor.set_enabled(enabled);
        self.reconcile_monitoring().await?;

        if enabled && !self.monitor.is_active() {
            info!("Monitoring will start once both folders are selected");
            self.emit_event(ControllerEvent::MonitoringDeferred);
        }

        self.persist_settings().await;
        Ok(self.monitoring_mode())
    }

    async fn set_polling_frequency(&mut self, secs: u64) -> Result<()> {
        let interval = PollingInterval::new(secs)?;
        if interval == self.monitor.interval() {
            debug!("Polling frequency already {}", interval);
            return Ok(());
        }

        self.monitor.set_interval(interval).await?;
        self.emit_event(ControllerEvent::IntervalChanged {
            interval_secs: interval.as_secs(),
        });

        self.persist_settings().await;
        Ok(())
    }

    /// Bring the timer in line with intent and readiness
    ///
    /// A freshly created timer is followed by one immediate sync.
    async fn reconcile_monitoring(&mut self) -> Result<()> {
        match self.monitor.reconcile(self.selection.is_ready()).await {
            Ok(TimerChange::Started) => {
                self.emit_event(ControllerEvent::MonitoringStarted {
                    interval_secs: self.monitor.interval().as_secs(),
                });
                if self.begin_sync(SyncTrigger::Activation).is_ok() {
                    self.dispatch_sync(SyncTrigger::Activation, None);
                }
                Ok(())
            }
            Ok(TimerChange::Stopped) => {
                self.emit_event(ControllerEvent::MonitoringStopped);
                Ok(())
            }
            Ok(TimerChange::Unchanged) => Ok(()),
            Err(e) => {
                self.emit_event(ControllerEvent::MonitoringStartFailed {
                    reason: e.failure_reason(),
                });
                Err(e)
            }
        }
    }

    fn on_timer_fire(&mut self) {
        debug!("Monitoring timer fired");
        if self.begin_sync(SyncTrigger::Timer).is_ok() {
            self.dispatch_sync(SyncTrigger::Timer, None);
        }
    }

    /// Mark a sync as started, or explain why it cannot start
    fn begin_sync(&mut self, trigger: SyncTrigger) -> Result<()> {
        match self.status.begin_sync(&self.selection) {
            Ok(transition) => {
                if let Some(transition) = transition {
                    self.emit_status(transition);
                }
                self.emit_event(ControllerEvent::SyncStarted { trigger });
                Ok(())
            }
            Err(e) => {
                debug!("{} sync not started: {}", trigger, e);
                self.emit_event(ControllerEvent::SyncSkipped {
                    trigger,
                    reason: e.failure_reason(),
                });
                Err(e)
            }
        }
    }

    fn dispatch_sync(
        &mut self,
        trigger: SyncTrigger,
        responder: Option<tokio::sync::oneshot::Sender<Result<SyncReport>>>,
    ) {
        let synchronizer = Arc::clone(&self.synchronizer);
        let source = self.selection.source().to_string();
        let destination = self.selection.destination().to_string();
        info!("Starting {} sync: '{}' -> '{}'", trigger, source, destination);

        let ticket = SyncTicket {
            generation: self.selection.generation(),
            trigger,
            responder,
        };
        self.monitor.dispatch(
            async move { synchronizer.synchronize(&source, &destination).await },
            ticket,
        );
    }

    fn on_sync_finished(&mut self, finished: FinishedSync) {
        let FinishedSync { ticket, result } = finished;
        let trigger = ticket.trigger;

        if ticket.generation != self.selection.generation() {
            debug!(
                "Folders changed while the {} sync ran, discarding its result",
                trigger
            );
            if let Some(transition) = self.status.abandon_sync(&self.selection) {
                self.emit_status(transition);
            }
        } else {
            match &result {
                Ok(report) => {
                    info!(
                        "{} sync finished: {} copied, {} skipped, {} bytes",
                        trigger, report.files_copied, report.files_skipped, report.bytes_copied
                    );
                    self.last_synced_at = Some(report.finished_at);
                    if let Some(transition) = self.status.complete_sync(&self.selection, Ok(())) {
                        self.emit_status(transition);
                    }
                    self.emit_event(ControllerEvent::SyncSucceeded {
                        trigger,
                        report: report.clone(),
                    });
                }
                Err(e) => {
                    let reason = e.failure_reason();
                    error!("{} sync failed: {}", trigger, reason);
                    if let Some(transition) = self
                        .status
                        .complete_sync(&self.selection, Err(reason.clone()))
                    {
                        self.emit_status(transition);
                    }
                    self.emit_event(ControllerEvent::SyncFailed { trigger, reason });
                }
            }
        }

        if let Some(responder) = ticket.responder {
            let _ = responder.send(result.map_err(|e| match e {
                Error::SyncFailure(_) => e,
                other => Error::sync_failure(other.failure_reason()),
            }));
        }
    }

    async fn restore(&mut self) {
        let saved = match self.settings.load().await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                debug!("No saved settings to restore");
                return;
            }
            Err(e) => {
                warn!("Failed to load saved settings: {}", e);
                return;
            }
        };
        info!(
            "Restoring settings: '{}' -> '{}', every {}, monitoring {}",
            saved.source_folder,
            saved.destination_folder,
            saved.polling_frequency,
            if saved.monitoring { "on" } else { "off" }
        );

        self.selection.set(FolderRole::Source, saved.source_folder);
        self.selection
            .set(FolderRole::Destination, saved.destination_folder);
        if let Some(transition) = self.status.selection_changed(&self.selection) {
            self.emit_status(transition);
        }

        if let Err(e) = self.monitor.set_interval(saved.polling_frequency).await {
            warn!("Failed to restore polling frequency: {}", e);
        }
        self.monitor.set_enabled(saved.monitoring);
        if let Err(e) = self.reconcile_monitoring().await {
            warn!("Failed to resume monitoring: {}", e);
        }
    }

    async fn persist_settings(&self) {
        let settings = Settings::new(
            self.selection.source(),
            self.selection.destination(),
            self.monitor.interval(),
            self.monitor.is_enabled(),
        );
        if let Err(e) = self.settings.save(&settings).await {
            warn!("Failed to save settings: {}", e);
        }
    }

    async fn shutdown(&mut self, reason: &str) -> Result<()> {
        info!("Stopping sync controller: {}", reason);

        let was_active = self.monitor.is_active();
        if self.monitor.is_in_flight() {
            info!("A sync is still running; it will finish in the background");
        }
        self.monitor.shutdown().await;
        if was_active {
            self.emit_event(ControllerEvent::MonitoringStopped);
        }
        self.emit_event(ControllerEvent::Stopped {
            reason: reason.to_string(),
        });

        // Flush settings before exiting
        self.settings.flush().await?;
        info!("Settings flushed, controller stopped");

        Ok(())
    }

    fn monitoring_mode(&self) -> MonitoringMode {
        if self.monitor.is_active() {
            MonitoringMode::Active
        } else if self.monitor.is_enabled() {
            MonitoringMode::Pending
        } else {
            MonitoringMode::Off
        }
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            status: self.status.status(),
            last_error: self.status.last_error().map(str::to_string),
            is_monitoring: self.monitor.is_enabled(),
            monitoring_active: self.monitor.is_active(),
            polling_frequency_secs: self.monitor.interval().as_secs(),
            source_folder: self.selection.source().to_string(),
            destination_folder: self.selection.destination().to_string(),
            last_synced_at: self.last_synced_at,
        }
    }

    fn emit_status(&self, transition: StatusTransition) {
        debug!("Status: {} -> {}", transition.from, transition.to);
        self.emit_event(ControllerEvent::StatusChanged {
            from: transition.from,
            to: transition.to,
        });
    }

    /// Emit a controller event
    fn emit_event(&self, event: ControllerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
