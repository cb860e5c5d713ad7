//! Loading and atomically saving the settings file.

use super::Settings;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Settings persistence error types.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to locate executable directory: {0}")]
    ExecutablePath(#[source] io::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How the settings came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Parsed from an existing file.
    Loaded,
    /// No file existed; defaults were written.
    Created,
    /// The file was unreadable or malformed; defaults replaced it.
    Reset,
}

impl LoadStatus {
    /// Status line shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            LoadStatus::Loaded => "Settings loaded successfully",
            LoadStatus::Created => "Default settings created",
            LoadStatus::Reset => "Settings reset to defaults due to loading error",
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub settings: Settings,
    pub status: LoadStatus,
}

/// Settings file at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` in the directory holding the running executable.
    pub fn beside_executable() -> Result<Self, SettingsError> {
        let exe = std::env::current_exe().map_err(SettingsError::ExecutablePath)?;
        let dir = exe.parent().ok_or_else(|| {
            SettingsError::ExecutablePath(io::Error::new(
                io::ErrorKind::NotFound,
                "executable has no parent directory",
            ))
        })?;
        Ok(Self::new(dir.join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load settings. Never fails: a missing file yields defaults (written
    /// out), a corrupt one is reset to defaults.
    pub fn load(&self) -> LoadOutcome {
        let status = match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(mut settings) => {
                    let adjusted = settings.window.validate() | settings.assign_short_ids();
                    if adjusted {
                        self.save_logged(&settings);
                    }
                    info!(path = %self.path.display(), devices = settings.device_settings.len(), "Loaded settings");
                    return LoadOutcome {
                        settings,
                        status: LoadStatus::Loaded,
                    };
                }
                Err(e) => {
                    warn!(path = %self.path.display(), "Malformed settings file, resetting: {e}");
                    LoadStatus::Reset
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No settings file, creating defaults");
                LoadStatus::Created
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Unreadable settings file, resetting: {e}");
                LoadStatus::Reset
            }
        };

        let settings = Settings::default();
        self.save_logged(&settings);
        LoadOutcome { settings, status }
    }

    /// Write to `settings.json.tmp`, then rename over the real file.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        let temp = self.temp_path();

        fs::write(&temp, json).map_err(|source| SettingsError::Write {
            path: temp.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(SettingsError::Write {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }

    fn save_logged(&self, settings: &Settings) {
        if let Err(e) = self.save(settings) {
            warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{HotkeyBinding, HotkeySettings, Modifier};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store() -> (TempDir, SettingsStore) {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE_NAME));
        (dir, store)
    }

    #[test]
    fn missing_file_creates_defaults() {
        let (_dir, store) = store();
        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Created);
        assert_eq!(outcome.settings, Settings::default());
        assert!(store.path().exists());
    }

    #[test]
    fn corrupt_file_resets_to_defaults() {
        let (_dir, store) = store();
        fs::write(store.path(), "{ this is not json").unwrap();

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Reset);
        assert_eq!(outcome.settings, Settings::default());

        let rewritten: Settings =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(rewritten, Settings::default());
    }

    #[test]
    fn save_then_load_preserves_device_settings() {
        let (_dir, store) = store();
        let mut settings = Settings::default();
        settings.observe_device("{0.0.0.00000000}.{abc}", "Headphones (USB)");
        let device = settings.device_mut("{0.0.0.00000000}.{abc}").unwrap();
        device.is_hidden = true;
        device.user_remark = "desk".into();
        let binding = HotkeyBinding::new(&[Modifier::Ctrl, Modifier::Alt], "F5").unwrap();
        device.hotkey = HotkeySettings::from(Some(&binding));

        store.save(&settings).unwrap();
        let outcome = store.load();

        assert_eq!(outcome.status, LoadStatus::Loaded);
        assert_eq!(outcome.settings, settings);
        let reloaded = outcome.settings.device("{0.0.0.00000000}.{abc}").unwrap();
        assert_eq!(reloaded.hotkey.binding(), Some(binding));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn load_repairs_geometry_and_missing_short_ids() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{ "Window": { "Width": 10 }, "DeviceSettings": { "x": { "DeviceId": "x", "DeviceName": "X" } } }"#,
        )
        .unwrap();

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Loaded);
        assert_eq!(outcome.settings.window.width, 800.0);
        assert_eq!(outcome.settings.device("x").unwrap().simplified_id, "D1");

        let on_disk = fs::read_to_string(store.path()).unwrap();
        assert!(on_disk.contains("\"SimplifiedId\": \"D1\""));
    }

    #[test]
    fn status_messages() {
        assert_eq!(LoadStatus::Loaded.message(), "Settings loaded successfully");
        assert_eq!(LoadStatus::Created.message(), "Default settings created");
        assert_eq!(
            LoadStatus::Reset.message(),
            "Settings reset to defaults due to loading error"
        );
    }
}
