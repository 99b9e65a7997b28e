//! Minimal embedding example for foldersync-core
//!
//! This example demonstrates using foldersync-core as a library in a custom
//! application with its own synchronizer. The controller lifecycle is fully
//! managed by the application.

use foldersync_core::{
    ControllerConfig, ControllerEvent, MemorySettingsStore, Result, SyncController, SyncReport,
    Synchronizer,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Custom synchronizer that only pretends to copy
struct EmbeddedSynchronizer {
    passes: Arc<AtomicUsize>,
}

impl EmbeddedSynchronizer {
    fn new() -> Self {
        Self {
            passes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl Synchronizer for EmbeddedSynchronizer {
    async fn synchronize(&self, source: &str, destination: &str) -> Result<SyncReport> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[Embedded] Pass {}: {} -> {}", pass, source, destination);

        // Simulate some work
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut report = SyncReport::new();
        report.files_copied = pass;
        Ok(report)
    }

    fn synchronizer_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded foldersync-core Example ===\n");

    // Create controller
    println!("1. Creating controller...");
    let config = ControllerConfig::default()
        .with_default_interval_secs(1)
        .with_restore_settings(false);
    let (controller, handle, events) = SyncController::new(
        Box::new(EmbeddedSynchronizer::new()),
        Box::new(MemorySettingsStore::new()),
        config,
    )?;

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        let mut events = ReceiverStream::new(events);
        while let Some(event) = events.next().await {
            if let ControllerEvent::StatusChanged { from, to } = &event {
                println!("[Status] {} -> {}", from, to);
            } else {
                println!("[Event] {:?}", event);
            }
        }
        println!("Event listener stopped");
    });

    println!("3. Starting controller in background...");
    let controller_task = controller.spawn();

    // Monitoring is requested before the folders exist; it starts by itself
    println!("\n4. Requesting monitoring before picking folders...");
    let mode = handle.set_monitoring(true).await?;
    println!("   Monitoring mode: {:?}", mode);

    handle.set_source_folder("/home/me/Documents").await?;
    handle.set_destination_folder("/mnt/backup/Documents").await?;

    // Let a few timer fires happen
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    println!("\n5. Manual sync while monitoring...");
    match handle.sync_now().await {
        Ok(report) => println!("   Manual pass copied {} files", report.files_copied),
        Err(e) => println!("   Manual pass rejected: {}", e),
    }

    let snapshot = handle.snapshot().await?;
    println!("\n6. Snapshot: {:?}", snapshot);

    println!("\n7. Stopping controller...");
    handle.shutdown().await?;
    let _ = controller_task.await;
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Controller lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- The timer is released on shutdown");
    println!("- The synchronizer is custom (not the foldersync-copy default)");

    Ok(())
}
