//! Audio module: the provider capability and its Windows implementation.
//!
//! This module provides playback device enumeration, default device
//! switching, device notifications and the background worker that keeps
//! provider calls off the UI thread.

pub mod device;
pub mod provider;
pub mod worker;

#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod notifications;
#[cfg(windows)]
pub mod policy;

pub use device::{AudioError, DeviceRole, PlaybackDevice};
pub use provider::{switch_default, AudioProvider};
pub use worker::{Job, JobResult, SwitchOrigin, Worker};

#[cfg(windows)]
pub use enumerator::{ComGuard, CoreAudioProvider, DeviceEnumerator};
#[cfg(windows)]
pub use notifications::DeviceWatcher;
