//! Sync status state machine
//!
//! Status is never set directly. It is recomputed by [`derive_status`] from the
//! folder selection and the outcome of the most recent synchronize call every
//! time either of them changes.
//!
//! ```text
//!            folders set           begin_sync
//!   idle ───────────────▶ ready ─────────────▶ syncing
//!    ▲                     ▲  ▲                 │   │
//!    │ folder cleared      │  └──── success ────┘   │ failure
//!    └─────────────────────┤                        ▼
//!                          └── success / folder ── error
//!                              change
//! ```

use crate::selection::FolderSelection;
use serde::{Deserialize, Serialize};

/// Status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// One or both folders are missing
    #[default]
    Idle,
    /// Folders are set and nothing is running
    Ready,
    /// A synchronize call is in flight
    Syncing,
    /// The last synchronize call failed
    Error,
}

impl Status {
    /// Short label for display
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "Waiting for folders",
            Status::Ready => "Ready to sync",
            Status::Syncing => "Syncing...",
            Status::Error => "Sync error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the most recent synchronize attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncOutcome {
    /// Nothing attempted since the folders last changed
    #[default]
    None,
    /// A call is outstanding
    InFlight,
    /// The last call succeeded
    Succeeded,
    /// The last call failed with this reason
    Failed(String),
}

/// A change of [`Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    /// Status before the change
    pub from: Status,
    /// Status after the change
    pub to: Status,
}

/// Compute the status for a selection and sync outcome
pub fn derive_status(selection: &FolderSelection, outcome: &SyncOutcome) -> Status {
    if !selection.is_ready() {
        return Status::Idle;
    }

    match outcome {
        SyncOutcome::InFlight => Status::Syncing,
        SyncOutcome::Failed(_) => Status::Error,
        SyncOutcome::None | SyncOutcome::Succeeded => Status::Ready,
    }
}

/// Holds the last sync outcome and the status derived from it
#[derive(Debug, Default)]
pub struct StatusMachine {
    outcome: SyncOutcome,
    status: Status,
}

impl StatusMachine {
    /// Start in `idle` with no outcome
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Outcome of the last attempt
    pub fn outcome(&self) -> &SyncOutcome {
        &self.outcome
    }

    /// Reason of the last failure, if it is still unresolved
    pub fn last_error(&self) -> Option<&str> {
        match &self.outcome {
            SyncOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether a synchronize call is outstanding
    pub fn is_in_flight(&self) -> bool {
        self.outcome == SyncOutcome::InFlight
    }

    /// Folders changed; an unresolved error or a stale success no longer applies
    pub fn selection_changed(&mut self, selection: &FolderSelection) -> Option<StatusTransition> {
        if !self.is_in_flight() {
            self.outcome = SyncOutcome::None;
        }
        self.recompute(selection)
    }

    /// Mark a synchronize call as dispatched
    ///
    /// Fails with `InvalidConfiguration` when folders are missing and with
    /// `SyncInFlight` when a call is already outstanding.
    pub fn begin_sync(
        &mut self,
        selection: &FolderSelection,
    ) -> Result<Option<StatusTransition>, crate::Error> {
        selection.require_ready()?;
        if self.is_in_flight() {
            return Err(crate::Error::SyncInFlight);
        }

        self.outcome = SyncOutcome::InFlight;
        Ok(self.recompute(selection))
    }

    /// Record the result of the outstanding call
    pub fn complete_sync(
        &mut self,
        selection: &FolderSelection,
        result: Result<(), String>,
    ) -> Option<StatusTransition> {
        self.outcome = match result {
            Ok(()) => SyncOutcome::Succeeded,
            Err(reason) => SyncOutcome::Failed(reason),
        };
        self.recompute(selection)
    }

    /// Clear the in-flight marker without attributing a result
    ///
    /// Used when the finished call was dispatched against an older selection.
    pub fn abandon_sync(&mut self, selection: &FolderSelection) -> Option<StatusTransition> {
        if self.is_in_flight() {
            self.outcome = SyncOutcome::None;
        }
        self.recompute(selection)
    }

    fn recompute(&mut self, selection: &FolderSelection) -> Option<StatusTransition> {
        let next = derive_status(selection, &self.outcome);
        if next == self.status {
            return None;
        }

        let transition = StatusTransition {
            from: self.status,
            to: next,
        };
        self.status = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::FolderRole;

    fn ready_selection() -> FolderSelection {
        FolderSelection::with_paths("/a", "/b")
    }

    #[test]
    fn idle_whenever_a_folder_is_missing() {
        let selection = FolderSelection::with_paths("/a", "");
        for outcome in [
            SyncOutcome::None,
            SyncOutcome::InFlight,
            SyncOutcome::Succeeded,
            SyncOutcome::Failed("boom".into()),
        ] {
            assert_eq!(derive_status(&selection, &outcome), Status::Idle);
        }
    }

    #[test]
    fn success_path_goes_ready_syncing_ready() {
        let selection = ready_selection();
        let mut machine = StatusMachine::new();

        let t = machine.selection_changed(&selection).unwrap();
        assert_eq!((t.from, t.to), (Status::Idle, Status::Ready));

        let t = machine.begin_sync(&selection).unwrap().unwrap();
        assert_eq!(t.to, Status::Syncing);

        let t = machine.complete_sync(&selection, Ok(())).unwrap();
        assert_eq!(t.to, Status::Ready);
        assert!(!machine.is_in_flight());
    }

    #[test]
    fn failure_is_retained_until_folder_change() {
        let mut selection = ready_selection();
        let mut machine = StatusMachine::new();
        machine.selection_changed(&selection);

        machine.begin_sync(&selection).unwrap();
        machine.complete_sync(&selection, Err("disk full".into()));
        assert_eq!(machine.status(), Status::Error);
        assert_eq!(machine.last_error(), Some("disk full"));

        selection.set(FolderRole::Destination, "/c");
        let t = machine.selection_changed(&selection).unwrap();
        assert_eq!((t.from, t.to), (Status::Error, Status::Ready));
        assert_eq!(machine.last_error(), None);
    }

    #[test]
    fn begin_sync_rejects_reentry_and_missing_folders() {
        let selection = ready_selection();
        let mut machine = StatusMachine::new();

        assert!(matches!(
            machine.begin_sync(&FolderSelection::new()),
            Err(crate::Error::InvalidConfiguration(_))
        ));

        machine.begin_sync(&selection).unwrap();
        assert!(matches!(
            machine.begin_sync(&selection),
            Err(crate::Error::SyncInFlight)
        ));
        assert_eq!(machine.status(), Status::Syncing);
    }

    #[test]
    fn clearing_a_folder_mid_sync_goes_idle_and_keeps_in_flight() {
        let mut selection = ready_selection();
        let mut machine = StatusMachine::new();
        machine.selection_changed(&selection);
        machine.begin_sync(&selection).unwrap();

        selection.set(FolderRole::Source, "");
        let t = machine.selection_changed(&selection).unwrap();
        assert_eq!(t.to, Status::Idle);
        assert!(machine.is_in_flight());

        assert!(machine.abandon_sync(&selection).is_none());
        assert!(!machine.is_in_flight());
        assert_eq!(machine.status(), Status::Idle);
    }
}
