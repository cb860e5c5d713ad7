//! Audio Device Switcher - Library
//!
//! A system tray utility for switching the default playback device on
//! Windows.
//!
//! ## Features
//!
//! - Tray menu listing active playback devices, default device checked
//! - One-click switching, applied to every device role
//! - Global hotkeys per device
//! - Short device ids (`D1`, `D2`, ...) and a registry command slot so
//!   other programs can request a switch
//! - Hidden devices, remarks and custom icons, persisted in `settings.json`
//! - Automatic refresh on device hot-plug events
//! - Start with Windows option
//!
//! The state machine in [`app`] is platform-neutral; the Windows pieces
//! sit behind the traits in [`audio`], [`hotkey`] and [`platform`].

pub mod app;
pub mod audio;
pub mod command;
pub mod donation;
pub mod hotkey;
pub mod logging;
pub mod platform;
pub mod reconcile;
pub mod settings;
pub mod ui;

pub use app::{Action, AppContext, AppState, Effect};
pub use audio::{AudioError, AudioProvider, PlaybackDevice};
pub use hotkey::{HotkeyBinding, HotkeyTable};
pub use platform::{AutoStart, SharedStore};
pub use settings::{Settings, SettingsStore};
