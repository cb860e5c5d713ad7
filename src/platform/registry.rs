//! Windows Registry backends for the shared store and auto-start.

use super::store::{AutoStart, SharedStore, StoreError};
use windows::core::PCWSTR;
use windows::Win32::Foundation::ERROR_FILE_NOT_FOUND;
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW,
    HKEY, HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_CREATE_KEY_DISPOSITION,
    REG_OPTION_NON_VOLATILE, REG_SZ,
};

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// `REG_SZ` values under `HKCU\SOFTWARE\AudioDeviceSwitcher`.
pub struct RegistryStore {
    key_path: Vec<u16>,
}

impl RegistryStore {
    pub const KEY: &'static str = r"SOFTWARE\AudioDeviceSwitcher";

    pub fn new() -> Self {
        Self {
            key_path: to_wide(Self::KEY),
        }
    }

    /// Create the key if needed, proving the registry is writable.
    pub fn open() -> Result<Self, StoreError> {
        let store = Self::new();
        let hkey = store.create_key()?;
        unsafe {
            let _ = RegCloseKey(hkey);
        }
        Ok(store)
    }

    fn create_key(&self) -> Result<HKEY, StoreError> {
        unsafe {
            let mut hkey = HKEY::default();
            let mut disposition = REG_CREATE_KEY_DISPOSITION::default();

            let result = RegCreateKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.key_path.as_ptr()),
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_READ | KEY_WRITE,
                None,
                &mut hkey,
                Some(&mut disposition),
            );

            if result.is_err() {
                return Err(StoreError::Access(format!(
                    "Failed to create {}: {:?}",
                    Self::KEY,
                    result
                )));
            }
            Ok(hkey)
        }
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for RegistryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.key_path.as_ptr()),
                0,
                KEY_READ,
                &mut hkey,
            );

            if result == ERROR_FILE_NOT_FOUND {
                return Ok(None);
            }
            if result.is_err() {
                return Err(StoreError::ReadFailed {
                    key: key.to_string(),
                });
            }

            let value_name = to_wide(key);
            let mut data_size = 0u32;

            // First call sizes the buffer
            let result = RegQueryValueExW(
                hkey,
                PCWSTR::from_raw(value_name.as_ptr()),
                None,
                None,
                None,
                Some(&mut data_size),
            );

            if result == ERROR_FILE_NOT_FOUND {
                let _ = RegCloseKey(hkey);
                return Ok(None);
            }
            if result.is_err() {
                let _ = RegCloseKey(hkey);
                return Err(StoreError::ReadFailed {
                    key: key.to_string(),
                });
            }

            let mut buffer = vec![0u16; (data_size as usize).div_ceil(2)];
            let result = RegQueryValueExW(
                hkey,
                PCWSTR::from_raw(value_name.as_ptr()),
                None,
                None,
                Some(buffer.as_mut_ptr() as *mut u8),
                Some(&mut data_size),
            );

            let _ = RegCloseKey(hkey);

            if result.is_err() {
                return Err(StoreError::ReadFailed {
                    key: key.to_string(),
                });
            }

            let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
            Ok(Some(String::from_utf16_lossy(&buffer[..len])))
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let hkey = self.create_key()?;
        unsafe {
            let value_name = to_wide(key);
            let data = to_wide(value);

            let result = RegSetValueExW(
                hkey,
                PCWSTR::from_raw(value_name.as_ptr()),
                0,
                REG_SZ,
                Some(std::slice::from_raw_parts(
                    data.as_ptr() as *const u8,
                    data.len() * 2,
                )),
            );

            let _ = RegCloseKey(hkey);

            if result.is_err() {
                Err(StoreError::WriteFailed {
                    key: key.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}

/// Entry under the per-user `Run` key.
pub struct RunKeyAutoStart {
    run_key_path: Vec<u16>,
    value_name: Vec<u16>,
}

impl RunKeyAutoStart {
    const RUN_KEY: &'static str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const APP_NAME: &'static str = "AudioDeviceSwitcher";

    pub fn new() -> Self {
        Self {
            run_key_path: to_wide(Self::RUN_KEY),
            value_name: to_wide(Self::APP_NAME),
        }
    }

    /// The Run value: the executable path, quoted so spaces survive.
    fn launch_command() -> Result<String, StoreError> {
        let exe_path = std::env::current_exe().map_err(|_| StoreError::WriteFailed {
            key: Self::APP_NAME.to_string(),
        })?;
        Ok(format!("\"{}\"", exe_path.to_string_lossy()))
    }
}

impl Default for RunKeyAutoStart {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoStart for RunKeyAutoStart {
    fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        // Resolved before the key is opened; nothing may return early past RegOpenKeyExW
        let command_wide = if enabled {
            Some(to_wide(&Self::launch_command()?))
        } else {
            None
        };

        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.run_key_path.as_ptr()),
                0,
                KEY_WRITE,
                &mut hkey,
            );

            if result.is_err() {
                return Err(StoreError::Access("Failed to open Run key".to_string()));
            }

            let result = match &command_wide {
                Some(command_wide) => RegSetValueExW(
                    hkey,
                    PCWSTR::from_raw(self.value_name.as_ptr()),
                    0,
                    REG_SZ,
                    Some(std::slice::from_raw_parts(
                        command_wide.as_ptr() as *const u8,
                        command_wide.len() * 2,
                    )),
                ),
                None => RegDeleteValueW(hkey, PCWSTR::from_raw(self.value_name.as_ptr())),
            };

            let _ = RegCloseKey(hkey);

            // Deleting an absent value is fine
            if result.is_err() && enabled {
                Err(StoreError::WriteFailed {
                    key: Self::APP_NAME.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}
