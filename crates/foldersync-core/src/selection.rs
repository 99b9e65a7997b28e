// # Folder Selection
//
// The source/destination pair the controller synchronizes. Pure data: the
// only rule is that both paths must be non-empty before anything may sync.

use serde::{Deserialize, Serialize};

/// Which side of the pair a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRole {
    /// Folder being mirrored
    Source,
    /// Folder receiving the mirror
    Destination,
}

impl std::fmt::Display for FolderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderRole::Source => f.write_str("source"),
            FolderRole::Destination => f.write_str("destination"),
        }
    }
}

/// Source and destination folder paths
///
/// Every effective change bumps [`FolderSelection::generation`], which lets the
/// controller tell whether a finished sync still belongs to the current pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSelection {
    source: String,
    destination: String,
    #[serde(skip)]
    generation: u64,
}

impl FolderSelection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection from both paths
    pub fn with_paths(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            generation: 0,
        }
    }

    /// Source folder path (may be empty)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Destination folder path (may be empty)
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Path for the given role
    pub fn path(&self, role: FolderRole) -> &str {
        match role {
            FolderRole::Source => &self.source,
            FolderRole::Destination => &self.destination,
        }
    }

    /// Both folders are set
    pub fn is_ready(&self) -> bool {
        !self.source.is_empty() && !self.destination.is_empty()
    }

    /// Counter bumped on every effective change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace one of the paths
    ///
    /// Returns `false` (and leaves the generation alone) when the path is unchanged.
    pub fn set(&mut self, role: FolderRole, path: impl Into<String>) -> bool {
        let path = path.into();
        let slot = match role {
            FolderRole::Source => &mut self.source,
            FolderRole::Destination => &mut self.destination,
        };

        if *slot == path {
            return false;
        }

        *slot = path;
        self.generation += 1;
        true
    }

    /// Check readiness, naming the missing folders otherwise
    pub fn require_ready(&self) -> Result<(), crate::Error> {
        match (self.source.is_empty(), self.destination.is_empty()) {
            (false, false) => Ok(()),
            (true, true) => Err(crate::Error::invalid_configuration(
                "Please select both source and destination folders",
            )),
            (true, false) => Err(crate::Error::invalid_configuration(
                "Please select a source folder",
            )),
            (false, true) => Err(crate::Error::invalid_configuration(
                "Please select a destination folder",
            )),
        }
    }
}
