//! Tray user interface.
//!
//! The menu model is platform-neutral; the tray renderer is Windows-only.

pub mod menu;

#[cfg(windows)]
pub mod tray;

pub use menu::MenuEntry;

#[cfg(windows)]
pub use tray::{TrayError, TrayManager};
