//! Monitoring lifecycle
//!
//! [`MonitoringLifecycle`] is the only owner of the recurring timer and of the
//! in-flight synchronize task. It keeps one invariant:
//!
//! ```text
//! timer exists  <=>  enabled && folders ready
//! ```
//!
//! The controller reports readiness through [`MonitoringLifecycle::reconcile`]
//! after every change, and the lifecycle creates or drops the timer (telling the
//! [`MonitorSession`] about it) to match.
//!
//! Timers are plain [`tokio::time::Interval`]s whose first tick is a full period
//! away, so rebuilding one on an interval change never produces an early fire.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PollingInterval;
use crate::error::{Error, Result};
use crate::traits::{MonitorSession, SyncReport};

/// What caused a synchronize call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTrigger {
    /// The user asked for it
    Manual,
    /// The monitoring timer fired
    Timer,
    /// Monitoring just became active
    Activation,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Manual => f.write_str("manual"),
            SyncTrigger::Timer => f.write_str("timer"),
            SyncTrigger::Activation => f.write_str("activation"),
        }
    }
}

/// Effect of a reconcile on the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerChange {
    Started,
    Stopped,
    Unchanged,
}

/// Bookkeeping carried alongside a dispatched synchronize call
#[derive(Debug)]
pub(crate) struct SyncTicket {
    /// Folder selection generation the call was made for
    pub generation: u64,
    pub trigger: SyncTrigger,
    /// Caller waiting on the result, for manual syncs
    pub responder: Option<oneshot::Sender<Result<SyncReport>>>,
}

/// Something the controller has to react to
#[derive(Debug)]
pub(crate) enum Activity {
    /// The monitoring timer fired
    Fire,
    /// The in-flight synchronize resolved
    Finished(FinishedSync),
}

/// A synchronize call that has resolved
#[derive(Debug)]
pub(crate) struct FinishedSync {
    pub ticket: SyncTicket,
    pub result: Result<SyncReport>,
}

struct InFlight {
    handle: JoinHandle<Result<SyncReport>>,
    ticket: SyncTicket,
}

/// Owner of the monitoring timer and the in-flight synchronize task
pub(crate) struct MonitoringLifecycle {
    session: Box<dyn MonitorSession>,
    enabled: bool,
    interval: PollingInterval,
    timer: Option<Interval>,
    in_flight: Option<InFlight>,
}

impl MonitoringLifecycle {
    pub fn new(session: Box<dyn MonitorSession>, interval: PollingInterval) -> Self {
        Self {
            session,
            enabled: false,
            interval,
            timer: None,
            in_flight: None,
        }
    }

    /// Monitoring intent
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A timer currently exists
    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn interval(&self) -> PollingInterval {
        self.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record the monitoring intent; call [`reconcile`](Self::reconcile) afterwards
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Create or drop the timer so that it exists iff `enabled && ready`
    ///
    /// When the session refuses to start, `enabled` is reset to `false`, no
    /// timer is created and `MonitoringStartFailure` is returned.
    pub async fn reconcile(&mut self, ready: bool) -> Result<TimerChange> {
        match (self.enabled && ready, self.timer.is_some()) {
            (true, false) => {
                if let Err(e) = self.session.start(self.interval).await {
                    self.enabled = false;
                    warn!(
                        "Monitor session '{}' rejected start: {}",
                        self.session.session_name(),
                        e
                    );
                    return Err(into_start_failure(e));
                }

                self.timer = Some(new_timer(self.interval));
                info!("Monitoring started with {} interval", self.interval);
                Ok(TimerChange::Started)
            }
            (false, true) => {
                self.cancel_timer().await;
                Ok(TimerChange::Stopped)
            }
            _ => Ok(TimerChange::Unchanged),
        }
    }

    /// Change the polling interval
    ///
    /// An active timer is replaced by one whose first fire is a full new
    /// interval away. Returns whether a timer was rebuilt. If the session
    /// rejects the new interval, nothing changes.
    pub async fn set_interval(&mut self, interval: PollingInterval) -> Result<bool> {
        if self.timer.is_none() {
            self.interval = interval;
            debug!("Polling interval stored as {} for future activation", interval);
            return Ok(false);
        }

        self.session.reconfigure(interval).await?;
        self.interval = interval;
        self.timer = Some(new_timer(interval));
        info!("Polling frequency updated to {}", interval);
        Ok(true)
    }

    /// Run `call` as the single in-flight synchronize
    ///
    /// The caller must have checked [`is_in_flight`](Self::is_in_flight).
    pub fn dispatch<F>(&mut self, call: F, ticket: SyncTicket)
    where
        F: Future<Output = Result<SyncReport>> + Send + 'static,
    {
        debug_assert!(self.in_flight.is_none(), "at most one synchronize in flight");

        let handle = tokio::spawn(call);
        self.in_flight = Some(InFlight { handle, ticket });
    }

    /// Wait for the timer to fire or the in-flight call to finish
    ///
    /// Never resolves while there is neither a timer nor a call in flight.
    /// Cancel safe: dropping the future loses no tick and leaves the call in
    /// flight.
    pub async fn next_activity(&mut self) -> Activity {
        let Self {
            timer, in_flight, ..
        } = self;

        tokio::select! {
            () = next_tick(timer) => Activity::Fire,
            Some(finished) = next_completion(in_flight) => Activity::Finished(finished),
        }
    }

    /// Release the timer and let go of any in-flight call
    ///
    /// The in-flight task keeps running to completion; its result is discarded.
    pub async fn shutdown(&mut self) {
        self.cancel_timer().await;

        if let Some(in_flight) = self.in_flight.take() {
            debug!(
                "Leaving in-flight {} synchronize to finish; its result will be discarded",
                in_flight.ticket.trigger
            );
        }
    }

    async fn cancel_timer(&mut self) -> bool {
        if self.timer.take().is_none() {
            return false;
        }

        if let Err(e) = self.session.stop().await {
            warn!(
                "Monitor session '{}' failed to stop cleanly: {}",
                self.session.session_name(),
                e
            );
        }
        info!("Monitoring stopped");
        true
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer.as_mut() {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn next_completion(slot: &mut Option<InFlight>) -> Option<FinishedSync> {
    let joined = match slot.as_mut() {
        Some(in_flight) => (&mut in_flight.handle).await,
        None => return std::future::pending().await,
    };

    let result = joined.unwrap_or_else(|e| {
        Err(Error::sync_failure(format!(
            "synchronize task ended abnormally: {}",
            e
        )))
    });

    // Taken right away so a finished handle is never polled again
    slot.take().map(|in_flight| FinishedSync {
        ticket: in_flight.ticket,
        result,
    })
}

fn new_timer(interval: PollingInterval) -> Interval {
    let period = interval.as_duration();
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

fn into_start_failure(error: Error) -> Error {
    match error {
        Error::MonitoringStartFailure(_) => error,
        other => Error::monitoring_start(other.failure_reason()),
    }
}
