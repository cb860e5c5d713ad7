//! Settings document persisted as `settings.json` beside the executable.
//!
//! Field names are PascalCase so existing files keep loading. Missing
//! fields take their defaults; a malformed file is replaced wholesale.

pub mod store;

pub use store::{LoadOutcome, LoadStatus, SettingsError, SettingsStore};

use crate::hotkey::HotkeySettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregate settings root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub window: WindowSettings,
    pub user_interaction: UserInteractionSettings,
    pub display: DisplaySettings,
    pub system: SystemSettings,
    /// Per-device preferences keyed by device identifier.
    pub device_settings: BTreeMap<String, DeviceSettings>,
}

/// Written as a name; read from a name (any case) or its index, since
/// older files stored the numeric form. Unknown values fall back to `Normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WindowStateValue")]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

impl WindowState {
    const ALL: [WindowState; 3] = [
        WindowState::Normal,
        WindowState::Minimized,
        WindowState::Maximized,
    ];

    fn name(self) -> &'static str {
        match self {
            WindowState::Normal => "Normal",
            WindowState::Minimized => "Minimized",
            WindowState::Maximized => "Maximized",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WindowStateValue {
    Index(u64),
    Name(String),
}

impl From<WindowStateValue> for WindowState {
    fn from(value: WindowStateValue) -> Self {
        let state = match &value {
            WindowStateValue::Index(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| WindowState::ALL.get(i).copied()),
            WindowStateValue::Name(name) => WindowState::ALL
                .into_iter()
                .find(|s| s.name().eq_ignore_ascii_case(name)),
        };
        state.unwrap_or_else(|| {
            debug!("Unknown window state, using Normal");
            WindowState::Normal
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WindowSettings {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub window_state: WindowState,
    pub device_name_column_width: f64,
    pub status_column_width: f64,
    pub hotkey_column_width: f64,
    pub remarks_column_width: f64,
}

impl WindowSettings {
    const DEFAULT_WIDTH: f64 = 800.0;
    const DEFAULT_HEIGHT: f64 = 500.0;
    const DEFAULT_POSITION: f64 = 100.0;
    const DEVICE_NAME_COLUMN: f64 = 350.0;
    const STATUS_COLUMN: f64 = 80.0;
    const HOTKEY_COLUMN: f64 = 120.0;
    const REMARKS_COLUMN: f64 = 200.0;

    /// Reset out-of-range geometry to defaults. Returns true if anything changed.
    pub fn validate(&mut self) -> bool {
        let before = self.clone();

        if !(300.0..=3000.0).contains(&self.width) {
            self.width = Self::DEFAULT_WIDTH;
        }
        if !(200.0..=2000.0).contains(&self.height) {
            self.height = Self::DEFAULT_HEIGHT;
        }
        if self.left < 0.0 {
            self.left = Self::DEFAULT_POSITION;
        }
        if self.top < 0.0 {
            self.top = Self::DEFAULT_POSITION;
        }

        for (width, default) in [
            (&mut self.device_name_column_width, Self::DEVICE_NAME_COLUMN),
            (&mut self.status_column_width, Self::STATUS_COLUMN),
            (&mut self.hotkey_column_width, Self::HOTKEY_COLUMN),
            (&mut self.remarks_column_width, Self::REMARKS_COLUMN),
        ] {
            if !(10.0..=2000.0).contains(&*width) {
                *width = default;
            }
        }

        *self != before
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            left: Self::DEFAULT_POSITION,
            top: Self::DEFAULT_POSITION,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            window_state: WindowState::Normal,
            device_name_column_width: Self::DEVICE_NAME_COLUMN,
            status_column_width: Self::STATUS_COLUMN,
            hotkey_column_width: Self::HOTKEY_COLUMN,
            remarks_column_width: Self::REMARKS_COLUMN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserInteractionSettings {
    /// Single-click (true) or double-click (false) selects a device.
    pub use_single_click_to_select_device: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DisplaySettings {
    pub show_hidden_device_count: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_hidden_device_count: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SystemSettings {
    pub start_in_tray: bool,
    pub start_with_windows: bool,
}

/// Locally owned record for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceSettings {
    pub device_id: String,
    pub device_name: String,
    pub is_hidden: bool,
    pub user_remark: String,
    pub hotkey: HotkeySettings,
    /// Short alias for external callers (`D1`, `D2`, ...). Empty until assigned.
    pub simplified_id: String,
    /// Glyph chosen by the user; empty means auto-detect from the name.
    pub custom_icon: String,
}

impl DeviceSettings {
    pub fn new(device_id: &str, device_name: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            ..Default::default()
        }
    }

    pub fn custom_icon(&self) -> Option<&str> {
        (!self.custom_icon.is_empty()).then_some(self.custom_icon.as_str())
    }

    pub fn short_id(&self) -> Option<&str> {
        (!self.simplified_id.is_empty()).then_some(self.simplified_id.as_str())
    }
}

impl Settings {
    /// Record a device sighting: create its record lazily, refresh the
    /// stored name and make sure it has a short id.
    ///
    /// Returns true when the document changed and should be saved.
    pub fn observe_device(&mut self, device_id: &str, device_name: &str) -> bool {
        let mut changed = false;

        let entry = self
            .device_settings
            .entry(device_id.to_string())
            .or_insert_with(|| {
                debug!(device_id, device_name, "Created settings for new device");
                changed = true;
                DeviceSettings::new(device_id, device_name)
            });

        if entry.device_id != device_id {
            entry.device_id = device_id.to_string();
            changed = true;
        }
        if entry.device_name != device_name {
            entry.device_name = device_name.to_string();
            changed = true;
        }

        if entry.simplified_id.is_empty() {
            let short_id = self.next_short_id();
            debug!(device_id, %short_id, "Assigned short id");
            if let Some(entry) = self.device_settings.get_mut(device_id) {
                entry.simplified_id = short_id;
            }
            changed = true;
        }

        changed
    }

    /// Give every record lacking one a short id. Returns true if any were assigned.
    pub fn assign_short_ids(&mut self) -> bool {
        let missing: Vec<String> = self
            .device_settings
            .iter()
            .filter(|(_, d)| d.simplified_id.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        for device_id in &missing {
            let short_id = self.next_short_id();
            if let Some(entry) = self.device_settings.get_mut(device_id) {
                entry.simplified_id = short_id;
            }
        }

        !missing.is_empty()
    }

    /// Lowest `D<n>` (n >= 1) not held by any record. Held ids are
    /// compared ignoring ASCII case, the same rule lookups use.
    pub fn next_short_id(&self) -> String {
        let mut n = 1u32;
        loop {
            let candidate = format!("D{n}");
            if !self
                .device_settings
                .values()
                .any(|d| d.simplified_id.eq_ignore_ascii_case(&candidate))
            {
                return candidate;
            }
            n += 1;
        }
    }

    /// Device identifier holding `short_id`. Comparison ignores ASCII case.
    pub fn device_for_short_id(&self, short_id: &str) -> Option<&str> {
        self.device_settings
            .iter()
            .find(|(_, d)| !d.simplified_id.is_empty() && d.simplified_id.eq_ignore_ascii_case(short_id))
            .map(|(id, _)| id.as_str())
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceSettings> {
        self.device_settings.get(device_id)
    }

    pub fn device_mut(&mut self, device_id: &str) -> Option<&mut DeviceSettings> {
        self.device_settings.get_mut(device_id)
    }

    pub fn is_hidden(&self, device_id: &str) -> bool {
        self.device(device_id).is_some_and(|d| d.is_hidden)
    }

    /// Hidden records, sorted by name.
    pub fn hidden_devices(&self) -> Vec<&DeviceSettings> {
        let mut hidden: Vec<&DeviceSettings> =
            self.device_settings.values().filter(|d| d.is_hidden).collect();
        hidden.sort_by(|a, b| a.device_name.cmp(&b.device_name));
        hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn defaults_match_settings_file_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.window.width, 800.0);
        assert_eq!(settings.window.height, 500.0);
        assert_eq!(settings.window.left, 100.0);
        assert!(settings.display.show_hidden_device_count);
        assert!(!settings.system.start_with_windows);
        assert!(!settings.user_interaction.use_single_click_to_select_device);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let json = r#"{ "Window": { "Width": 1024 }, "DeviceSettings": { "x": { "IsHidden": true } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.window.width, 1024.0);
        assert_eq!(settings.window.height, 500.0);
        assert!(settings.display.show_hidden_device_count);
        assert!(settings.is_hidden("x"));
        assert_eq!(settings.device("x").unwrap().hotkey, HotkeySettings::default());
    }

    #[test]
    fn serializes_pascal_case_names() {
        let mut settings = Settings::default();
        settings.window.window_state = WindowState::Maximized;
        settings.observe_device("{id}", "Speakers");

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["Window"]["WindowState"], "Maximized");
        assert_eq!(json["Display"]["ShowHiddenDeviceCount"], true);
        assert_eq!(json["DeviceSettings"]["{id}"]["SimplifiedId"], "D1");
        assert_eq!(json["DeviceSettings"]["{id}"]["Hotkey"]["IsEnabled"], false);
    }

    #[test]
    fn validate_resets_out_of_range_geometry() {
        let mut window = WindowSettings {
            left: -50.0,
            top: 20.0,
            width: 120.0,
            height: 5000.0,
            status_column_width: 5.0,
            remarks_column_width: 400.0,
            ..Default::default()
        };

        assert!(window.validate());
        assert_eq!(window.left, 100.0);
        assert_eq!(window.top, 20.0);
        assert_eq!(window.width, 800.0);
        assert_eq!(window.height, 500.0);
        assert_eq!(window.status_column_width, 80.0);
        assert_eq!(window.remarks_column_width, 400.0);

        assert!(!window.validate());
    }

    #[test]
    fn short_ids_fill_the_first_gap() {
        let mut settings = Settings::default();
        for (id, short) in [("a", "D1"), ("c", "D3")] {
            let mut device = DeviceSettings::new(id, id);
            device.simplified_id = short.to_string();
            settings.device_settings.insert(id.to_string(), device);
        }

        assert!(settings.observe_device("b", "B"));
        assert_eq!(settings.device("b").unwrap().simplified_id, "D2");

        assert!(settings.observe_device("d", "D"));
        assert_eq!(settings.device("d").unwrap().simplified_id, "D4");
    }

    #[test]
    fn short_ids_are_stable_and_injective() {
        let mut settings = Settings::default();
        for i in 0..20 {
            settings.observe_device(&format!("dev-{i}"), "Device");
        }
        let first: Vec<String> = settings
            .device_settings
            .values()
            .map(|d| d.simplified_id.clone())
            .collect();

        for i in 0..20 {
            assert!(!settings.observe_device(&format!("dev-{i}"), "Device"));
        }
        let second: Vec<String> = settings
            .device_settings
            .values()
            .map(|d| d.simplified_id.clone())
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<HashSet<_>>().len(), 20);
    }

    #[test]
    fn assign_short_ids_fills_records_loaded_without_one() {
        let mut settings = Settings::default();
        settings
            .device_settings
            .insert("a".into(), DeviceSettings::new("a", "A"));
        settings
            .device_settings
            .insert("b".into(), DeviceSettings::new("b", "B"));

        assert!(settings.assign_short_ids());
        assert!(!settings.assign_short_ids());
        assert_eq!(settings.device_for_short_id("D1"), Some("a"));
        assert_eq!(settings.device_for_short_id("d2"), Some("b"));
        assert_eq!(settings.device_for_short_id("D3"), None);
    }

    #[test]
    fn observe_updates_renamed_device() {
        let mut settings = Settings::default();
        settings.observe_device("a", "Old name");
        assert!(settings.observe_device("a", "New name"));
        assert_eq!(settings.device("a").unwrap().device_name, "New name");
        assert_eq!(settings.device("a").unwrap().simplified_id, "D1");
    }

    #[test]
    fn hidden_devices_sorted_by_name() {
        let mut settings = Settings::default();
        for (id, name, hidden) in [("1", "Zeta", true), ("2", "Alpha", true), ("3", "Mid", false)] {
            settings.observe_device(id, name);
            settings.device_mut(id).unwrap().is_hidden = hidden;
        }

        let names: Vec<&str> = settings
            .hidden_devices()
            .iter()
            .map(|d| d.device_name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn short_id_allocation_ignores_case_of_held_ids() {
        let mut settings = Settings::default();
        let mut edited = DeviceSettings::new("a", "A");
        edited.simplified_id = "d1".into();
        settings.device_settings.insert("a".into(), edited);

        assert_eq!(settings.next_short_id(), "D2");
        settings.observe_device("b", "B");
        assert_eq!(settings.device_for_short_id("D1"), Some("a"));
        assert_eq!(settings.device_for_short_id("d2"), Some("b"));
    }

    #[test]
    fn window_state_reads_names_and_indices() {
        let read = |json: &str| -> WindowState {
            let settings: Settings =
                serde_json::from_str(&format!(r#"{{ "Window": {{ "WindowState": {json} }} }}"#))
                    .unwrap();
            settings.window.window_state
        };

        assert_eq!(read("2"), WindowState::Maximized);
        assert_eq!(read("1"), WindowState::Minimized);
        assert_eq!(read(r#""maximized""#), WindowState::Maximized);
        assert_eq!(read("7"), WindowState::Normal);
        assert_eq!(read(r#""Fullscreen""#), WindowState::Normal);

        let json = serde_json::to_value(WindowState::Minimized).unwrap();
        assert_eq!(json, serde_json::json!("Minimized"));
    }
}
