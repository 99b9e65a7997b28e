//! Contract Test: Polling Interval
//!
//! This test verifies the recurring timer's schedule using paused time.
//!
//! Constraints verified:
//! - Out-of-range frequencies are rejected and change nothing
//! - Activation syncs once immediately, then once per interval
//! - Changing the interval while active restarts the countdown with no extra fire
//! - Changing the interval while inactive only stores it
//!
//! If this test fails, someone has added:
//! - A timer that keeps its old schedule after a change
//! - A second timer running next to the first

mod common;

use common::*;
use foldersync_core::{ControllerEvent, Error};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn out_of_range_frequency_is_rejected() {
    let running = spawn_controller(Box::new(CountingSynchronizer::new()));

    for secs in [0, 61, 3_600] {
        let result = running.handle.set_polling_frequency(secs).await;
        assert!(
            matches!(result, Err(Error::FrequencyOutOfRange(s)) if s == secs),
            "{}s should be rejected, got {:?}",
            secs,
            result
        );
    }

    let snapshot = running.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.polling_frequency_secs, 5);

    running.handle.set_polling_frequency(60).await.unwrap();
    running.handle.set_polling_frequency(1).await.unwrap();
    assert_eq!(
        running.handle.snapshot().await.unwrap().polling_frequency_secs,
        1
    );

    running.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn activation_syncs_immediately_then_every_interval() {
    let synchronizer = CountingSynchronizer::new();
    let mut running = ready_controller(Box::new(CountingSynchronizer::sharing_counters_with(
        &synchronizer,
    )))
    .await;

    running.handle.set_monitoring(true).await.unwrap();
    wait_for_sync_result(&mut running.events).await;
    assert_eq!(synchronizer.call_count(), 1);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(synchronizer.call_count(), 1, "no fire before the interval");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(synchronizer.call_count(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(synchronizer.call_count(), 4);

    running.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_change_while_active_restarts_the_countdown() {
    let synchronizer = CountingSynchronizer::new();
    let session = RecordingSession::new();
    let (controller, handle, mut events) = foldersync_core::SyncController::new(
        Box::new(CountingSynchronizer::sharing_counters_with(&synchronizer)),
        Box::new(foldersync_core::MemorySettingsStore::new()),
        test_config(),
    )
    .unwrap();
    let task = controller
        .with_session(Box::new(RecordingSession::sharing_counters_with(&session)))
        .spawn();

    handle.set_source_folder("/src").await.unwrap();
    handle.set_destination_folder("/dst").await.unwrap();
    handle.set_monitoring(true).await.unwrap();
    wait_for_sync_result(&mut events).await;
    assert_eq!(synchronizer.call_count(), 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    handle.set_polling_frequency(10).await.unwrap();
    assert_eq!(session.reconfigure_count(), 1);

    // The old 5s schedule would have fired one second from now
    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(synchronizer.call_count(), 1, "no early or extra fire");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(synchronizer.call_count(), 2);

    let seen = drain(&mut events);
    assert!(seen.contains(&ControllerEvent::IntervalChanged { interval_secs: 10 }));

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn same_frequency_is_a_no_op() {
    let session = RecordingSession::new();
    let (controller, handle, _events) = foldersync_core::SyncController::new(
        Box::new(CountingSynchronizer::new()),
        Box::new(foldersync_core::MemorySettingsStore::new()),
        test_config(),
    )
    .unwrap();
    let _task = controller
        .with_session(Box::new(RecordingSession::sharing_counters_with(&session)))
        .spawn();

    handle.set_source_folder("/src").await.unwrap();
    handle.set_destination_folder("/dst").await.unwrap();
    handle.set_monitoring(true).await.unwrap();

    handle.set_polling_frequency(5).await.unwrap();
    assert_eq!(session.reconfigure_count(), 0);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_change_while_inactive_is_stored() {
    let synchronizer = CountingSynchronizer::new();
    let mut running = ready_controller(Box::new(CountingSynchronizer::sharing_counters_with(
        &synchronizer,
    )))
    .await;

    running.handle.set_polling_frequency(20).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(synchronizer.call_count(), 0);

    running.handle.set_monitoring(true).await.unwrap();
    wait_for_sync_result(&mut running.events).await;

    tokio::time::sleep(Duration::from_millis(19_900)).await;
    assert_eq!(synchronizer.call_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(synchronizer.call_count(), 2);

    running.handle.shutdown().await.unwrap();
}
