// # Settings Store Implementations
//
// This module provides implementations of the SettingsStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileSettingsStore, FileSettingsStoreFactory};
pub use memory::{MemorySettingsStore, MemorySettingsStoreFactory};
