//! Hotkey bindings and the fixed key table.

use super::HotkeyError;
use std::fmt;

pub const MOD_ALT: u32 = 0x0001;
pub const MOD_CONTROL: u32 = 0x0002;
pub const MOD_SHIFT: u32 = 0x0004;

/// Modifier keys a binding may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    /// Display/serialization order.
    pub const ALL: [Modifier; 3] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift];

    pub fn token(self) -> &'static str {
        match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Alt => "Alt",
            Modifier::Shift => "Shift",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Modifier::ALL.into_iter().find(|m| m.token() == token)
    }

    /// The `MOD_*` flag RegisterHotKey expects.
    pub fn flag(self) -> u32 {
        match self {
            Modifier::Ctrl => MOD_CONTROL,
            Modifier::Alt => MOD_ALT,
            Modifier::Shift => MOD_SHIFT,
        }
    }
}

/// Main keys offered for hotkeys, with their virtual key codes.
pub const KEY_TABLE: &[(&str, u32)] = &[
    ("F1", 0x70),
    ("F2", 0x71),
    ("F3", 0x72),
    ("F4", 0x73),
    ("F5", 0x74),
    ("F6", 0x75),
    ("F7", 0x76),
    ("F8", 0x77),
    ("F9", 0x78),
    ("F10", 0x79),
    ("F11", 0x7A),
    ("F12", 0x7B),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),
    ("0", 0x30),
    ("A", 0x41),
    ("B", 0x42),
    ("C", 0x43),
    ("D", 0x44),
    ("E", 0x45),
    ("F", 0x46),
    ("G", 0x47),
    ("H", 0x48),
    ("I", 0x49),
    ("J", 0x4A),
    ("K", 0x4B),
    ("L", 0x4C),
    ("M", 0x4D),
    ("N", 0x4E),
    ("O", 0x4F),
    ("P", 0x50),
    ("Q", 0x51),
    ("R", 0x52),
    ("S", 0x53),
    ("T", 0x54),
    ("U", 0x55),
    ("V", 0x56),
    ("W", 0x57),
    ("X", 0x58),
    ("Y", 0x59),
    ("Z", 0x5A),
    ("Space", 0x20),
    ("Enter", 0x0D),
    ("Tab", 0x09),
    ("Esc", 0x1B),
    ("Insert", 0x2D),
    ("Delete", 0x2E),
    ("Home", 0x24),
    ("End", 0x23),
    ("Page Up", 0x21),
    ("Page Down", 0x22),
    ("Left Arrow", 0x25),
    ("Up Arrow", 0x26),
    ("Right Arrow", 0x27),
    ("Down Arrow", 0x28),
];

/// An enabled hotkey: at least one modifier plus exactly one main key.
///
/// A disabled hotkey is represented as `Option::<HotkeyBinding>::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    modifiers: Vec<Modifier>,
    key: &'static str,
    virtual_key: u32,
}

impl HotkeyBinding {
    /// Build a binding, validating it against the key table.
    pub fn new(modifiers: &[Modifier], key: &str) -> Result<Self, HotkeyError> {
        let mut modifiers: Vec<Modifier> = modifiers.to_vec();
        modifiers.sort();
        modifiers.dedup();
        if modifiers.is_empty() {
            return Err(HotkeyError::MissingModifier);
        }

        let (key, virtual_key) = KEY_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .copied()
            .ok_or_else(|| HotkeyError::UnknownKey(key.to_string()))?;

        Ok(Self {
            modifiers,
            key,
            virtual_key,
        })
    }

    /// Parse persisted tokens (e.g. `["Ctrl", "Alt"]` and `"F5"`).
    pub fn from_tokens<S: AsRef<str>>(modifiers: &[S], key: &str) -> Result<Self, HotkeyError> {
        let parsed = modifiers
            .iter()
            .map(|m| {
                Modifier::from_token(m.as_ref())
                    .ok_or_else(|| HotkeyError::UnknownModifier(m.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&parsed, key)
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Combined `MOD_*` flags.
    pub fn modifier_flags(&self) -> u32 {
        self.modifiers.iter().fold(0, |acc, m| acc | m.flag())
    }

    pub fn virtual_key(&self) -> u32 {
        self.virtual_key
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{} + ", modifier.token())?;
        }
        f.write_str(self.key)
    }
}
