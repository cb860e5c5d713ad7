//! Audio device data models.
//!
//! Defines the data structures for representing playback devices as
//! reported by the audio provider, and the audio error type.

use thiserror::Error;

/// Error type carried by the underlying platform API.
#[cfg(windows)]
pub type PlatformError = windows::core::Error;

/// Error type carried by the underlying platform API.
#[cfg(not(windows))]
pub type PlatformError = std::io::Error;

/// An active playback device as seen by the audio provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDevice {
    /// Unique Windows device ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from device properties)
    pub name: String,

    /// Whether the OS currently routes playback to this device
    pub is_default: bool,
}

impl PlaybackDevice {
    /// Create a new PlaybackDevice that is not the default.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_default: false,
        }
    }

    /// Mark this device as the current default.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// Audio device role (maps to Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceRole {
    /// Used by games, system sounds, most general applications
    Console = 0,

    /// Used by music players, video players
    Multimedia = 1,

    /// Used by Teams, Zoom, Discord, and other VoIP applications
    Communications = 2,
}

impl DeviceRole {
    pub const ALL: [DeviceRole; 3] = [
        DeviceRole::Console,
        DeviceRole::Multimedia,
        DeviceRole::Communications,
    ];
}

/// Audio service error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("Operation not supported by the audio provider")]
    Unsupported,

    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] PlatformError),

    #[error("Failed to enumerate devices: {0}")]
    EnumerationFailed(#[source] PlatformError),

    #[error("Failed to set default device: {0}")]
    SetDefaultFailed(#[source] PlatformError),

    #[error("String conversion error: {0}")]
    StringConversion(String),

    #[error("Audio provider unavailable: {0}")]
    Unavailable(String),
}
