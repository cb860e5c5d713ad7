//! The audio provider capability.
//!
//! Everything above this trait is platform-neutral. The Windows
//! implementation lives in [`super::enumerator`].

use super::device::{AudioError, PlaybackDevice};
use tracing::debug;

/// Source of playback devices and the "set as default" operation.
///
/// Implementations are called from the background worker thread and must
/// not assume they run on the UI thread.
pub trait AudioProvider: Send + Sync {
    /// Get all active playback devices.
    fn playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError>;

    /// Set the device as the default for every role in one go.
    ///
    /// Providers that cannot do this return [`AudioError::Unsupported`].
    fn set_default_all_roles(&self, _device_id: &str) -> Result<(), AudioError> {
        Err(AudioError::Unsupported)
    }

    /// Set the device as the default for the console role.
    fn set_default(&self, device_id: &str) -> Result<(), AudioError>;
}

/// Make `device_id` the default playback device.
///
/// Tries the all-roles variant first and falls back to the single-role
/// call when the provider reports it as unsupported.
pub fn switch_default(provider: &dyn AudioProvider, device_id: &str) -> Result<(), AudioError> {
    match provider.set_default_all_roles(device_id) {
        Err(AudioError::Unsupported) => {
            debug!("All-roles switch unsupported, falling back to console role");
            provider.set_default(device_id)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        all_roles_supported: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl AudioProvider for Recording {
        fn playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
            Ok(Vec::new())
        }

        fn set_default_all_roles(&self, _device_id: &str) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push("all");
            if self.all_roles_supported {
                Ok(())
            } else {
                Err(AudioError::Unsupported)
            }
        }

        fn set_default(&self, _device_id: &str) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push("single");
            Ok(())
        }
    }

    #[test]
    fn uses_all_roles_when_supported() {
        let provider = Recording {
            all_roles_supported: true,
            ..Default::default()
        };
        switch_default(&provider, "dev").unwrap();
        assert_eq!(*provider.calls.lock().unwrap(), vec!["all"]);
    }

    #[test]
    fn falls_back_to_single_role() {
        let provider = Recording::default();
        switch_default(&provider, "dev").unwrap();
        assert_eq!(*provider.calls.lock().unwrap(), vec!["all", "single"]);
    }

    #[test]
    fn other_errors_do_not_fall_back() {
        struct Failing;
        impl AudioProvider for Failing {
            fn playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
                Ok(Vec::new())
            }
            fn set_default_all_roles(&self, device_id: &str) -> Result<(), AudioError> {
                Err(AudioError::DeviceNotFound {
                    device_id: device_id.to_string(),
                })
            }
            fn set_default(&self, _device_id: &str) -> Result<(), AudioError> {
                panic!("fallback must not run");
            }
        }

        let err = switch_default(&Failing, "gone").unwrap_err();
        assert!(matches!(err, AudioError::DeviceNotFound { .. }));
    }
}
