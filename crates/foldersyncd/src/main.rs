// # foldersyncd - Folder Sync Daemon
//
// A thin integration layer around foldersync-core. All sync and monitoring
// logic lives in the core; this binary only wires it up.
//
// The foldersyncd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the sync backends
// 4. Running the controller until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Folders
// - `FOLDERSYNC_SOURCE`: Folder to mirror
// - `FOLDERSYNC_DESTINATION`: Folder receiving the mirror
//
// ### Monitoring
// - `FOLDERSYNC_POLL_INTERVAL_SECS`: Seconds between syncs (1-60)
// - `FOLDERSYNC_MONITORING`: Turn monitoring on or off (true/false)
// - `FOLDERSYNC_SKIP_UNCHANGED`: Skip files already current (default true)
//
// ### Settings Store
// - `FOLDERSYNC_SETTINGS_STORE_TYPE`: Type of settings store (memory, file)
// - `FOLDERSYNC_SETTINGS_PATH`: Path to settings file (for file store)
//
// Values given here override the saved settings.
//
// ## Example
//
// ```bash
// export FOLDERSYNC_SOURCE=/home/me/Documents
// export FOLDERSYNC_DESTINATION=/mnt/backup/Documents
// export FOLDERSYNC_POLL_INTERVAL_SECS=10
// export FOLDERSYNC_MONITORING=true
// export FOLDERSYNC_SETTINGS_STORE_TYPE=file
// export FOLDERSYNC_SETTINGS_PATH=/var/lib/foldersync/settings.json
//
// foldersyncd
// ```

use anyhow::Result;
use foldersync_core::{
    ControllerConfig, ControllerEvent, ControllerHandle, FolderSyncConfig, PollingInterval,
    SettingsStoreConfig, SyncController, SyncerRegistry, SynchronizerConfig,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum FolderSyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FolderSyncExitCode> for ExitCode {
    fn from(code: FolderSyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    source: Option<String>,
    destination: Option<String>,
    poll_interval_secs: Option<u64>,
    monitoring: Option<bool>,
    skip_unchanged: bool,
    settings_store_type: String,
    settings_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let poll_interval_secs = match lookup("FOLDERSYNC_POLL_INTERVAL_SECS") {
            Some(value) => Some(value.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "FOLDERSYNC_POLL_INTERVAL_SECS must be a whole number of seconds. Got: {}",
                    value
                )
            })?),
            None => None,
        };

        let monitoring = match lookup("FOLDERSYNC_MONITORING") {
            Some(value) => Some(parse_flag("FOLDERSYNC_MONITORING", &value)?),
            None => None,
        };

        let skip_unchanged = match lookup("FOLDERSYNC_SKIP_UNCHANGED") {
            Some(value) => parse_flag("FOLDERSYNC_SKIP_UNCHANGED", &value)?,
            None => true,
        };

        Ok(Self {
            source: lookup("FOLDERSYNC_SOURCE"),
            destination: lookup("FOLDERSYNC_DESTINATION"),
            poll_interval_secs,
            monitoring,
            skip_unchanged,
            settings_store_type: lookup("FOLDERSYNC_SETTINGS_STORE_TYPE")
                .unwrap_or_else(|| "memory".to_string()),
            settings_path: lookup("FOLDERSYNC_SETTINGS_PATH"),
            log_level: lookup("FOLDERSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This checks:
    /// - Numeric ranges
    /// - Type enumerations
    /// - Settings file location
    fn validate(&self) -> Result<()> {
        if let Some(secs) = self.poll_interval_secs
            && PollingInterval::new(secs).is_err()
        {
            anyhow::bail!(
                "FOLDERSYNC_POLL_INTERVAL_SECS must be between {} and {} seconds. Got: {}",
                PollingInterval::MIN_SECS,
                PollingInterval::MAX_SECS,
                secs
            );
        }

        // Validate settings store type
        match self.settings_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "FOLDERSYNC_SETTINGS_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.settings_store_type
            ),
        }

        if self.settings_store_type == "file" {
            match self.settings_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "FOLDERSYNC_SETTINGS_PATH is required when FOLDERSYNC_SETTINGS_STORE_TYPE=file. \
                    Set it via: export FOLDERSYNC_SETTINGS_PATH=/var/lib/foldersync/settings.json"
                ),
                Some(path) => {
                    if let Some(parent) = std::path::Path::new(path).parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.exists()
                    {
                        anyhow::bail!(
                            "FOLDERSYNC_SETTINGS_PATH parent directory does not exist: {}. \
                            Create it first: mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            }
        }

        if let (Some(source), Some(destination)) = (&self.source, &self.destination)
            && !source.is_empty()
            && source == destination
        {
            anyhow::bail!("FOLDERSYNC_SOURCE and FOLDERSYNC_DESTINATION must differ");
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FOLDERSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Core configuration built from the daemon settings
    fn folder_sync_config(&self) -> FolderSyncConfig {
        let settings_store = match (self.settings_store_type.as_str(), &self.settings_path) {
            ("file", Some(path)) => SettingsStoreConfig::File { path: path.clone() },
            _ => SettingsStoreConfig::Memory,
        };

        FolderSyncConfig {
            synchronizer: SynchronizerConfig::Copy {
                skip_unchanged: self.skip_unchanged,
            },
            settings_store,
            controller: ControllerConfig::default(),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FolderSyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FolderSyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FolderSyncExitCode::ConfigError.into();
    }

    info!("Starting foldersyncd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FolderSyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            FolderSyncExitCode::RuntimeError
        } else {
            FolderSyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let registry = SyncerRegistry::with_builtin_stores();
    foldersync_copy::register(&registry);

    let folder_sync_config = config.folder_sync_config();
    folder_sync_config.validate()?;

    info!("Synchronizer type: {}", folder_sync_config.synchronizer.type_name());
    info!("Settings store type: {}", folder_sync_config.settings_store.type_name());

    let synchronizer = registry.create_synchronizer(&folder_sync_config.synchronizer)?;
    let settings = registry
        .create_settings_store(&folder_sync_config.settings_store)
        .await?;

    let (controller, handle, events) =
        SyncController::new(synchronizer, settings, folder_sync_config.controller)?;
    let controller_task = controller.spawn();
    let event_task = tokio::spawn(log_events(events));

    apply_overrides(&handle, &config).await?;

    let snapshot = handle.snapshot().await?;
    info!(
        "Ready: '{}' -> '{}', every {}s, monitoring {} ({})",
        snapshot.source_folder,
        snapshot.destination_folder,
        snapshot.polling_frequency_secs,
        if snapshot.is_monitoring { "on" } else { "off" },
        snapshot.status
    );

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    handle.shutdown().await?;
    controller_task.await??;
    drop(handle);

    if let Err(e) = event_task.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    Ok(())
}

/// Apply the folder, frequency and monitoring values given in the environment
async fn apply_overrides(handle: &ControllerHandle, config: &Config) -> Result<()> {
    if let Some(source) = &config.source {
        handle.set_source_folder(source.as_str()).await?;
    }
    if let Some(destination) = &config.destination {
        handle.set_destination_folder(destination.as_str()).await?;
    }
    if let Some(secs) = config.poll_interval_secs {
        handle.set_polling_frequency(secs).await?;
    }

    if let Some(enabled) = config.monitoring {
        match handle.set_monitoring(enabled).await {
            Ok(mode) => info!("Monitoring: {:?}", mode),
            // Not fatal: the daemon keeps serving manual syncs
            Err(e) => warn!("Could not enable monitoring: {}", e),
        }
    }

    Ok(())
}

/// Log controller events until the controller stops
async fn log_events(events: mpsc::Receiver<ControllerEvent>) {
    let mut events = ReceiverStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            ControllerEvent::StatusChanged { from, to } => {
                info!("Status: {} -> {}", from, to);
            }
            ControllerEvent::SyncStarted { trigger } => {
                debug!("Sync started ({})", trigger);
            }
            ControllerEvent::SyncSucceeded { trigger, report } => {
                info!(
                    "Sync succeeded ({}): {} copied, {} unchanged",
                    trigger, report.files_copied, report.files_skipped
                );
            }
            ControllerEvent::SyncFailed { trigger, reason } => {
                warn!("Sync failed ({}): {}", trigger, reason);
            }
            ControllerEvent::SyncSkipped { trigger, reason } => {
                debug!("Sync skipped ({}): {}", trigger, reason);
            }
            ControllerEvent::MonitoringStarted { interval_secs } => {
                info!("Monitoring started, syncing every {}s", interval_secs);
            }
            ControllerEvent::MonitoringStopped => info!("Monitoring stopped"),
            ControllerEvent::MonitoringDeferred => {
                info!("Monitoring will start once both folders are set");
            }
            ControllerEvent::MonitoringStartFailed { reason } => {
                warn!("Monitoring failed to start: {}", reason);
            }
            ControllerEvent::IntervalChanged { interval_secs } => {
                info!("Polling frequency set to {}s", interval_secs);
            }
            ControllerEvent::Stopped { reason } => info!("Controller stopped: {}", reason),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
