//! Platform services: the shared store, auto-start, hotkey registration
//! and icons.
//!
//! The traits and in-memory implementations build everywhere; the
//! registry and RegisterHotKey backends are Windows-only.

pub mod icons;
pub mod store;

#[cfg(windows)]
pub mod hotkeys;
#[cfg(windows)]
pub mod registry;

pub use store::{AutoStart, MemoryStore, NoAutoStart, SharedStore, StoreError};

#[cfg(windows)]
pub use hotkeys::Win32HotkeyRegistrar;
#[cfg(windows)]
pub use registry::{RegistryStore, RunKeyAutoStart};
