//! Device change notifications using IMMNotificationClient.
//!
//! The client does not carry event details across; any playback-related
//! change posts a single wake-up message to the owning window, and the
//! window requests a (coalesced) device list refresh.

use super::device::AudioError;
use super::enumerator::DeviceEnumerator;
use windows::core::{implement, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::Media::Audio::{
    eRender, EDataFlow, ERole, IMMNotificationClient, IMMNotificationClient_Impl, DEVICE_STATE,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
use windows::Win32::UI::WindowsAndMessaging::PostMessageW;
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

/// Keeps the notification client registered for as long as it lives.
///
/// Must be created and dropped on a thread with COM initialized.
pub struct DeviceWatcher {
    enumerator: DeviceEnumerator,
    client: IMMNotificationClient,
}

impl DeviceWatcher {
    /// Register a client that posts `message` to `hwnd` on every change.
    pub fn register(hwnd: HWND, message: u32) -> Result<Self, AudioError> {
        let enumerator = DeviceEnumerator::new()?;
        let client: IMMNotificationClient = NotificationClient { hwnd, message }.into();

        unsafe {
            enumerator
                .raw_enumerator()
                .RegisterEndpointNotificationCallback(&client)
                .map_err(AudioError::EnumerationFailed)?;
        }

        Ok(Self { enumerator, client })
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .enumerator
                .raw_enumerator()
                .UnregisterEndpointNotificationCallback(&self.client);
        }
    }
}

/// COM notification client for device change events
#[implement(IMMNotificationClient)]
struct NotificationClient {
    hwnd: HWND,
    message: u32,
}

impl IMMNotificationClient_Impl for NotificationClient_Impl {
    fn OnDeviceStateChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        self.notify_change();
        Ok(())
    }

    fn OnDeviceAdded(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        self.notify_change();
        Ok(())
    }

    fn OnDeviceRemoved(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        self.notify_change();
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        _role: ERole,
        _pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        // Only care about playback devices
        if flow == eRender {
            self.notify_change();
        }
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        // Renames are picked up by the periodic refresh
        Ok(())
    }
}

impl NotificationClient_Impl {
    fn notify_change(&self) {
        unsafe {
            let _ = PostMessageW(self.hwnd, self.message, WPARAM(0), LPARAM(0));
        }
    }
}
