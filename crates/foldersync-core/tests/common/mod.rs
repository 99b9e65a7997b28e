//! Test doubles and common utilities for controller contract tests
//!
//! This module provides minimal test doubles that verify the controller's
//! behavior without touching the filesystem.

use foldersync_core::config::{ControllerConfig, PollingInterval};
use foldersync_core::error::{Error, Result};
use foldersync_core::settings::MemorySettingsStore;
use foldersync_core::traits::{MonitorSession, Settings, SettingsStore, SyncReport, Synchronizer};
use foldersync_core::{ControllerEvent, ControllerHandle, Status, SyncController};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

/// A synchronizer that succeeds instantly and counts calls
pub struct CountingSynchronizer {
    /// Call counter for synchronize()
    call_count: Arc<AtomicUsize>,
    /// Recorded (source, destination) pairs
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl CountingSynchronizer {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the number of times synchronize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the folder pairs synchronize() was called with
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Create a new CountingSynchronizer that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            call_count: Arc::clone(&other.call_count),
            calls: Arc::clone(&other.calls),
        }
    }
}

#[async_trait::async_trait]
impl Synchronizer for CountingSynchronizer {
    async fn synchronize(&self, source: &str, destination: &str) -> Result<SyncReport> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((source.to_string(), destination.to_string()));
        Ok(SyncReport::new())
    }

    fn synchronizer_name(&self) -> &'static str {
        "counting"
    }
}

/// A synchronizer that blocks each call until the test opens the gate
pub struct GatedSynchronizer {
    call_count: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
}

impl GatedSynchronizer {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `calls` pending or future calls finish
    pub fn open(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Get the number of times synchronize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a new GatedSynchronizer that shares the gate and counter
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            call_count: Arc::clone(&other.call_count),
            gate: Arc::clone(&other.gate),
        }
    }
}

#[async_trait::async_trait]
impl Synchronizer for GatedSynchronizer {
    async fn synchronize(&self, _source: &str, _destination: &str) -> Result<SyncReport> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::sync_failure("gate closed"))?;
        permit.forget();

        Ok(SyncReport::new())
    }

    fn synchronizer_name(&self) -> &'static str {
        "gated"
    }
}

/// A synchronizer that plays back scripted outcomes, then succeeds
pub struct ScriptedSynchronizer {
    call_count: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<std::result::Result<(), String>>>>,
}

impl ScriptedSynchronizer {
    /// `Err(reason)` entries fail with `SyncFailure(reason)`
    pub fn new<'a>(
        outcomes: impl IntoIterator<Item = std::result::Result<(), &'a str>>,
    ) -> Self {
        let script = outcomes
            .into_iter()
            .map(|outcome| outcome.map_err(str::to_string))
            .collect();

        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            call_count: Arc::clone(&other.call_count),
            script: Arc::clone(&other.script),
        }
    }
}

#[async_trait::async_trait]
impl Synchronizer for ScriptedSynchronizer {
    async fn synchronize(&self, _source: &str, _destination: &str) -> Result<SyncReport> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Err(reason)) => Err(Error::sync_failure(reason)),
            Some(Ok(())) | None => Ok(SyncReport::new()),
        }
    }

    fn synchronizer_name(&self) -> &'static str {
        "scripted"
    }
}

/// A monitor session that records calls and can refuse to start
pub struct RecordingSession {
    start_count: Arc<AtomicUsize>,
    stop_count: Arc<AtomicUsize>,
    reconfigure_count: Arc<AtomicUsize>,
    reject_start: bool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            start_count: Arc::new(AtomicUsize::new(0)),
            stop_count: Arc::new(AtomicUsize::new(0)),
            reconfigure_count: Arc::new(AtomicUsize::new(0)),
            reject_start: false,
        }
    }

    /// A session whose start() always fails
    pub fn rejecting() -> Self {
        Self {
            reject_start: true,
            ..Self::new()
        }
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn reconfigure_count(&self) -> usize {
        self.reconfigure_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            start_count: Arc::clone(&other.start_count),
            stop_count: Arc::clone(&other.stop_count),
            reconfigure_count: Arc::clone(&other.reconfigure_count),
            reject_start: other.reject_start,
        }
    }
}

#[async_trait::async_trait]
impl MonitorSession for RecordingSession {
    async fn start(&self, _interval: PollingInterval) -> Result<()> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        if self.reject_start {
            return Err(Error::Other("remote session unavailable".to_string()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reconfigure(&self, _interval: PollingInterval) -> Result<()> {
        self.reconfigure_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn session_name(&self) -> &'static str {
        "recording"
    }
}

/// A settings store that counts saves and flushes
pub struct CountingSettingsStore {
    inner: MemorySettingsStore,
    save_call_count: Arc<AtomicUsize>,
    flush_call_count: Arc<AtomicUsize>,
}

impl CountingSettingsStore {
    pub fn new() -> Self {
        Self::wrapping(MemorySettingsStore::new())
    }

    pub fn wrapping(inner: MemorySettingsStore) -> Self {
        Self {
            inner,
            save_call_count: Arc::new(AtomicUsize::new(0)),
            flush_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    /// Last saved settings
    pub async fn saved(&self) -> Option<Settings> {
        self.inner.load().await.unwrap()
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            save_call_count: Arc::clone(&other.save_call_count),
            flush_call_count: Arc::clone(&other.flush_call_count),
        }
    }
}

#[async_trait::async_trait]
impl SettingsStore for CountingSettingsStore {
    async fn load(&self) -> Result<Option<Settings>> {
        self.inner.load().await
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.save(settings).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// A running controller under test
pub struct Running {
    pub handle: ControllerHandle,
    pub events: mpsc::Receiver<ControllerEvent>,
    pub task: JoinHandle<Result<()>>,
}

/// Config used by contract tests: nothing restored unless asked for
pub fn test_config() -> ControllerConfig {
    ControllerConfig::default().with_restore_settings(false)
}

/// Spawn a controller with an in-memory settings store
pub fn spawn_controller(synchronizer: Box<dyn Synchronizer>) -> Running {
    let (controller, handle, events) = SyncController::new(
        synchronizer,
        Box::new(MemorySettingsStore::new()),
        test_config(),
    )
    .expect("controller construction succeeds");

    Running {
        handle,
        events,
        task: controller.spawn(),
    }
}

/// Spawn a controller with `/src` and `/dst` already selected
pub async fn ready_controller(synchronizer: Box<dyn Synchronizer>) -> Running {
    let running = spawn_controller(synchronizer);
    running.handle.set_source_folder("/src").await.unwrap();
    running.handle.set_destination_folder("/dst").await.unwrap();
    running
}

/// Receive events until one matches, returning everything seen
pub async fn wait_for_event(
    events: &mut mpsc::Receiver<ControllerEvent>,
    mut matches: impl FnMut(&ControllerEvent) -> bool,
) -> Vec<ControllerEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(60), events.recv())
            .await
            .expect("timed out waiting for controller event")
            .expect("event channel closed");
        let done = matches(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Wait until a synchronize call finishes, successfully or not
pub async fn wait_for_sync_result(
    events: &mut mpsc::Receiver<ControllerEvent>,
) -> Vec<ControllerEvent> {
    wait_for_event(events, |event| {
        matches!(
            event,
            ControllerEvent::SyncSucceeded { .. } | ControllerEvent::SyncFailed { .. }
        )
    })
    .await
}

/// Status transitions contained in `events`, in order
pub fn status_changes(events: &[ControllerEvent]) -> Vec<(Status, Status)> {
    events
        .iter()
        .filter_map(|event| match event {
            ControllerEvent::StatusChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

/// Drain every event already queued
pub fn drain(events: &mut mpsc::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
