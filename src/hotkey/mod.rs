//! Global hotkeys: bindings, their persisted form, and the id table.

pub mod binding;
pub mod table;

pub use binding::{HotkeyBinding, Modifier, KEY_TABLE};
pub use table::{HotkeyRegistrar, HotkeyTable};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Hotkey error types.
#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("At least one modifier key (Ctrl, Alt, or Shift) is required")]
    MissingModifier,

    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("Unknown key: {0:?}")]
    UnknownKey(String),

    #[error("Hotkey {0} is already in use by another application")]
    RegistrationFailed(String),
}

/// Hotkey as stored in `settings.json`.
///
/// The OS codes are written out for external readers; on load the
/// binding is rebuilt from the tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HotkeySettings {
    pub is_enabled: bool,
    pub modifiers: Vec<String>,
    pub key: String,
    pub virtual_key_code: u32,
    pub modifier_flags: u32,
}

impl HotkeySettings {
    /// The validated binding, or None when disabled or invalid.
    pub fn binding(&self) -> Option<HotkeyBinding> {
        if !self.is_enabled {
            return None;
        }
        match HotkeyBinding::from_tokens(&self.modifiers, &self.key) {
            Ok(binding) => Some(binding),
            Err(e) => {
                warn!("Ignoring invalid stored hotkey: {e}");
                None
            }
        }
    }

    /// Human-readable form for menus.
    pub fn label(&self) -> String {
        self.binding()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "None".to_string())
    }
}

impl From<Option<&HotkeyBinding>> for HotkeySettings {
    fn from(binding: Option<&HotkeyBinding>) -> Self {
        match binding {
            Some(b) => Self {
                is_enabled: true,
                modifiers: b.modifiers().iter().map(|m| m.token().to_string()).collect(),
                key: b.key().to_string(),
                virtual_key_code: b.virtual_key(),
                modifier_flags: b.modifier_flags(),
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disabled_settings_are_all_zero() {
        let settings = HotkeySettings::from(None);
        assert_eq!(settings, HotkeySettings::default());
        assert_eq!(settings.binding(), None);
        assert_eq!(settings.label(), "None");
    }

    #[test]
    fn enabled_settings_roundtrip_binding() {
        let binding = HotkeyBinding::new(&[Modifier::Alt, Modifier::Shift], "F9").unwrap();
        let settings = HotkeySettings::from(Some(&binding));

        assert_eq!(
            settings,
            HotkeySettings {
                is_enabled: true,
                modifiers: vec!["Alt".into(), "Shift".into()],
                key: "F9".into(),
                virtual_key_code: 0x78,
                modifier_flags: 0x5,
            }
        );
        assert_eq!(settings.binding(), Some(binding));
        assert_eq!(settings.label(), "Alt + Shift + F9");
    }

    #[test]
    fn enabled_without_modifier_is_treated_as_disabled() {
        let settings = HotkeySettings {
            is_enabled: true,
            key: "F1".into(),
            virtual_key_code: 0x70,
            ..Default::default()
        };
        assert_eq!(settings.binding(), None);
    }
}
