//! Tray menu model.
//!
//! The menu is described as plain data built from [`AppState`] so its
//! content can be tested without a tray. [`super::tray`] renders it.

use crate::app::{Action, AppState};
use crate::hotkey::{HotkeyBinding, Modifier};
use crate::platform::icons::{glyph_label, ICON_CHOICES};
use crate::reconcile::DisplayedDevice;

/// Quick-assign keys offered in each device's hotkey submenu.
const QUICK_KEYS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
const QUICK_MODIFIERS: [Modifier; 2] = [Modifier::Ctrl, Modifier::Alt];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Greyed-out informational line.
    Label(String),
    Item {
        label: String,
        action: Action,
        /// `Some` renders a check item.
        checked: Option<bool>,
        enabled: bool,
    },
    Submenu {
        label: String,
        entries: Vec<MenuEntry>,
    },
    Separator,
}

impl MenuEntry {
    fn item(label: impl Into<String>, action: Action) -> Self {
        MenuEntry::Item {
            label: label.into(),
            action,
            checked: None,
            enabled: true,
        }
    }

    fn check(label: impl Into<String>, action: Action, checked: bool) -> Self {
        MenuEntry::Item {
            label: label.into(),
            action,
            checked: Some(checked),
            enabled: true,
        }
    }

    fn disabled(mut self) -> Self {
        if let MenuEntry::Item { enabled, .. } = &mut self {
            *enabled = false;
        }
        self
    }
}

/// Label for a device row, e.g. `🎧 Headphones [D2] (Ctrl + Alt + 2)`.
pub fn device_label(device: &DisplayedDevice) -> String {
    let mut label = format!("{} {}", device.glyph, device.name);
    if !device.short_id.is_empty() {
        label.push_str(&format!(" [{}]", device.short_id));
    }
    if device.hotkey_label != "None" {
        label.push_str(&format!(" ({})", device.hotkey_label));
    }
    if !device.remark.is_empty() {
        label.push_str(&format!(" - {}", device.remark));
    }
    label
}

/// Build the full context menu.
pub fn build(app: &AppState) -> Vec<MenuEntry> {
    let mut entries = vec![MenuEntry::Label(app.status().to_string())];
    if let Some(line) = app.hidden_count_line() {
        entries.push(MenuEntry::Label(line));
    }
    entries.push(MenuEntry::Separator);

    if app.devices().is_empty() {
        entries.push(MenuEntry::Label("No playback devices".to_string()));
    }
    for device in app.devices() {
        entries.push(MenuEntry::check(
            device_label(device),
            Action::SwitchTo(device.device_id.clone()),
            device.is_default,
        ));
    }

    entries.push(MenuEntry::Separator);

    if !app.devices().is_empty() {
        entries.push(MenuEntry::Submenu {
            label: "Manage devices".to_string(),
            entries: app.devices().iter().map(manage_submenu).collect(),
        });
    }

    let hidden = app.settings().hidden_devices();
    if !hidden.is_empty() {
        let mut show: Vec<MenuEntry> = hidden
            .iter()
            .map(|d| {
                MenuEntry::item(
                    format!("Show {}", d.device_name),
                    Action::UnhideDevice(d.device_id.clone()),
                )
            })
            .collect();
        show.push(MenuEntry::Separator);
        show.push(MenuEntry::item("Show all", Action::UnhideAll));
        entries.push(MenuEntry::Submenu {
            label: format!("Hidden devices ({})", hidden.len()),
            entries: show,
        });
    }

    let settings = app.settings();
    entries.extend([
        MenuEntry::item("Refresh", Action::Refresh),
        MenuEntry::Separator,
        MenuEntry::check(
            "Start with Windows",
            Action::ToggleStartWithWindows,
            settings.system.start_with_windows,
        ),
        MenuEntry::check(
            "Show hidden device count",
            Action::ToggleShowHiddenCount,
            settings.display.show_hidden_device_count,
        ),
        MenuEntry::item("Open settings file", Action::OpenSettingsFile),
        MenuEntry::item("Reload settings", Action::ReloadSettings),
        MenuEntry::Separator,
        MenuEntry::item("Exit", Action::Exit),
    ]);

    entries
}

fn manage_submenu(device: &DisplayedDevice) -> MenuEntry {
    let id = &device.device_id;

    let mut icons: Vec<MenuEntry> = ICON_CHOICES
        .iter()
        .map(|(glyph, label)| {
            MenuEntry::check(
                format!("{glyph} {label}"),
                Action::SetCustomIcon(id.clone(), Some(glyph.to_string())),
                device.glyph == *glyph,
            )
        })
        .collect();
    icons.push(MenuEntry::Separator);
    icons.push(MenuEntry::item(
        "Auto-detect",
        Action::SetCustomIcon(id.clone(), None),
    ));

    let mut hotkeys: Vec<MenuEntry> = QUICK_KEYS
        .iter()
        .filter_map(|key| HotkeyBinding::new(&QUICK_MODIFIERS, key).ok())
        .map(|binding| {
            let label = binding.to_string();
            MenuEntry::check(
                label.clone(),
                Action::SetHotkey(id.clone(), Some(binding)),
                device.hotkey_label == label,
            )
        })
        .collect();
    hotkeys.push(MenuEntry::Separator);
    let clear = MenuEntry::item("Remove hotkey", Action::SetHotkey(id.clone(), None));
    hotkeys.push(if device.hotkey_label == "None" {
        clear.disabled()
    } else {
        clear
    });

    // Remark text is edited in the settings file; the menu can only clear it
    let remark = if device.remark.is_empty() {
        MenuEntry::item("Clear remark", Action::SetRemark(id.clone(), String::new())).disabled()
    } else {
        MenuEntry::item(
            format!("Clear remark \"{}\"", device.remark),
            Action::SetRemark(id.clone(), String::new()),
        )
    };

    MenuEntry::Submenu {
        label: format!("{} {}", device.glyph, device.name),
        entries: vec![
            MenuEntry::Submenu {
                label: match glyph_label(&device.glyph) {
                    Some(name) => format!("Icon ({name})"),
                    None => "Icon".to_string(),
                },
                entries: icons,
            },
            MenuEntry::Submenu {
                label: "Hotkey".to_string(),
                entries: hotkeys,
            },
            MenuEntry::Separator,
            remark,
            MenuEntry::item("Hide from list", Action::HideDevice(id.clone())),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hotkey: &str, remark: &str) -> DisplayedDevice {
        DisplayedDevice {
            device_id: "id".into(),
            name: "Headphones".into(),
            is_default: true,
            short_id: "D2".into(),
            remark: remark.into(),
            hotkey_label: hotkey.into(),
            glyph: "🎧".into(),
        }
    }

    fn actions(entries: &[MenuEntry]) -> Vec<&Action> {
        let mut out = Vec::new();
        for entry in entries {
            match entry {
                MenuEntry::Item { action, .. } => out.push(action),
                MenuEntry::Submenu { entries, .. } => out.extend(actions(entries)),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn device_label_includes_extras() {
        assert_eq!(device_label(&row("None", "")), "🎧 Headphones [D2]");
        assert_eq!(
            device_label(&row("Ctrl + Alt + 2", "desk")),
            "🎧 Headphones [D2] (Ctrl + Alt + 2) - desk"
        );
    }

    #[test]
    fn manage_submenu_offers_icons_hotkeys_and_hide() {
        let entry = manage_submenu(&row("None", ""));
        let all = actions(std::slice::from_ref(&entry));

        let icon_choices = all
            .iter()
            .filter(|a| matches!(a, Action::SetCustomIcon(_, Some(_))))
            .count();
        assert_eq!(icon_choices, ICON_CHOICES.len());
        assert!(all.contains(&&Action::HideDevice("id".into())));
        assert!(all.contains(&&Action::SetCustomIcon("id".into(), None)));

        let quick = all
            .iter()
            .filter(|a| matches!(a, Action::SetHotkey(_, Some(_))))
            .count();
        assert_eq!(quick, QUICK_KEYS.len());
    }

    #[test]
    fn remove_hotkey_disabled_without_binding() {
        let MenuEntry::Submenu { entries, .. } = manage_submenu(&row("None", "")) else {
            panic!("expected submenu");
        };
        let MenuEntry::Submenu { entries: hotkeys, .. } = &entries[1] else {
            panic!("expected hotkey submenu");
        };
        assert!(matches!(
            hotkeys.last(),
            Some(MenuEntry::Item { enabled: false, .. })
        ));
    }

    #[test]
    fn clear_remark_follows_remark_presence() {
        let clear = |device: &DisplayedDevice| {
            let MenuEntry::Submenu { entries, .. } = manage_submenu(device) else {
                panic!("expected submenu");
            };
            entries
                .into_iter()
                .find(|e| matches!(e, MenuEntry::Item { action: Action::SetRemark(..), .. }))
                .expect("clear remark entry")
        };

        assert!(matches!(
            clear(&row("None", "")),
            MenuEntry::Item { enabled: false, .. }
        ));
        assert_eq!(
            clear(&row("None", "desk")),
            MenuEntry::Item {
                label: "Clear remark \"desk\"".into(),
                action: Action::SetRemark("id".into(), String::new()),
                checked: None,
                enabled: true,
            }
        );
    }
}
