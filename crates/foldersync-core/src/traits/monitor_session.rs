// # Monitor Session Trait
//
// Some backends keep their own notion of "monitoring is on" (a remote
// session, a service that must be told the cadence). The controller still owns
// the recurring timer; it calls the session symmetrically with it:
//
// - timer created   -> `start(interval)`
// - timer dropped   -> `stop()`
// - timer rebuilt   -> `reconfigure(interval)`
//
// Stateless backends use [`LocalSession`], which accepts everything.

use async_trait::async_trait;

use crate::config::PollingInterval;

/// Backend-side monitoring session
///
/// A rejected `start` is reported to the user as
/// [`crate::Error::MonitoringStartFailure`] and leaves monitoring disabled.
/// Failures from `stop` are logged and otherwise ignored: the local timer is
/// always released.
#[async_trait]
pub trait MonitorSession: Send + Sync {
    /// Monitoring is about to start at `interval`
    async fn start(&self, interval: PollingInterval) -> Result<(), crate::Error>;

    /// Monitoring stopped
    async fn stop(&self) -> Result<(), crate::Error>;

    /// The interval changed while monitoring is active
    async fn reconfigure(&self, interval: PollingInterval) -> Result<(), crate::Error>;

    /// Session name (for logging/debugging)
    fn session_name(&self) -> &'static str;
}

/// Session for stateless backends: every call succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSession;

#[async_trait]
impl MonitorSession for LocalSession {
    async fn start(&self, _interval: PollingInterval) -> Result<(), crate::Error> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), crate::Error> {
        Ok(())
    }

    async fn reconfigure(&self, _interval: PollingInterval) -> Result<(), crate::Error> {
        Ok(())
    }

    fn session_name(&self) -> &'static str {
        "local"
    }
}
