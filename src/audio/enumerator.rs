//! Device enumeration using Windows MMDevice API.
//!
//! Provides COM initialization and the Core Audio implementation of
//! [`AudioProvider`].

use super::device::{AudioError, DeviceRole, PlaybackDevice};
use super::policy;
use super::provider::AudioProvider;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCommunications, eConsole, eMultimedia, eRender, ERole, IMMDevice, IMMDeviceEnumerator,
    MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            // Use apartment-threaded for UI compatibility
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(AudioError::ComInitFailed)?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Execute a closure with COM initialized for the current thread.
fn with_com<T, F: FnOnce() -> Result<T, AudioError>>(f: F) -> Result<T, AudioError> {
    let _guard = ComGuard::new()?;
    f()
}

/// Device enumerator using Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new DeviceEnumerator.
    ///
    /// Note: COM must be initialized before calling this function.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(AudioError::EnumerationFailed)?;

            Ok(Self { enumerator })
        }
    }

    /// Get all active playback devices.
    pub fn get_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(AudioError::EnumerationFailed)?;

            let count = collection
                .GetCount()
                .map_err(AudioError::EnumerationFailed)?;

            let default_console = self.get_default_device_id(DeviceRole::Console)?;

            let mut devices = Vec::with_capacity(count as usize);

            for i in 0..count {
                let device = collection.Item(i).map_err(AudioError::EnumerationFailed)?;

                if let Ok(playback) = self.to_playback_device(&device, &default_console) {
                    devices.push(playback);
                }
            }

            Ok(devices)
        }
    }

    /// Get the default playback device ID for a specific role.
    pub fn get_default_device_id(&self, role: DeviceRole) -> Result<Option<String>, AudioError> {
        unsafe {
            let device = match self
                .enumerator
                .GetDefaultAudioEndpoint(eRender, to_erole(role))
            {
                Ok(d) => d,
                Err(_) => return Ok(None),
            };

            let id = device.GetId().map_err(AudioError::EnumerationFailed)?;
            let id_string = id
                .to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()))?;

            Ok(Some(id_string))
        }
    }

    /// Get the raw IMMDeviceEnumerator for notification registration.
    pub fn raw_enumerator(&self) -> &IMMDeviceEnumerator {
        &self.enumerator
    }

    fn to_playback_device(
        &self,
        device: &IMMDevice,
        default_console: &Option<String>,
    ) -> Result<PlaybackDevice, AudioError> {
        unsafe {
            let id = device.GetId().map_err(AudioError::EnumerationFailed)?;
            let id_string = id
                .to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()))?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM(0))
                .map_err(AudioError::EnumerationFailed)?;

            let name = get_device_name(&props).unwrap_or_else(|| "Unknown".to_string());

            let is_default = default_console.as_deref() == Some(id_string.as_str());

            Ok(PlaybackDevice {
                id: id_string,
                name,
                is_default,
            })
        }
    }
}

/// Get the friendly name of a device from its property store.
fn get_device_name(props: &IPropertyStore) -> Option<String> {
    unsafe {
        // Convert DEVPROPKEY to PROPERTYKEY
        let key = PROPERTYKEY {
            fmtid: DEVPKEY_Device_FriendlyName.fmtid,
            pid: DEVPKEY_Device_FriendlyName.pid,
        };

        let prop = props.GetValue(&key).ok()?;

        let s = prop.to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

fn to_erole(role: DeviceRole) -> ERole {
    match role {
        DeviceRole::Console => eConsole,
        DeviceRole::Multimedia => eMultimedia,
        DeviceRole::Communications => eCommunications,
    }
}

/// Core Audio implementation of [`AudioProvider`].
///
/// COM objects are apartment-bound, so every call initializes COM on the
/// calling thread and creates its own enumerator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioProvider;

impl AudioProvider for CoreAudioProvider {
    fn playback_devices(&self) -> Result<Vec<PlaybackDevice>, AudioError> {
        with_com(|| DeviceEnumerator::new()?.get_devices())
    }

    fn set_default_all_roles(&self, device_id: &str) -> Result<(), AudioError> {
        with_com(|| {
            policy::set_default_device_for_all_roles(device_id).map_err(AudioError::SetDefaultFailed)
        })
    }

    fn set_default(&self, device_id: &str) -> Result<(), AudioError> {
        with_com(|| {
            policy::set_default_device(device_id, DeviceRole::Console)
                .map_err(AudioError::SetDefaultFailed)
        })
    }
}
