//! Process-wide key/value store shared with other programs.
//!
//! On Windows this is a registry key; [`MemoryStore`] stands in for it in
//! tests and when the registry cannot be opened.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Shared store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access registry: {0}")]
    Access(String),

    #[error("Failed to read value: {key}")]
    ReadFailed { key: String },

    #[error("Failed to write value: {key}")]
    WriteFailed { key: String },
}

/// String values addressed by name.
pub trait SharedStore {
    /// `Ok(None)` when the value does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Registers (or removes) the application for launch at sign-in.
pub trait AutoStart {
    fn set_enabled(&self, enabled: bool) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::ReadFailed {
            key: key.to_string(),
        })?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::WriteFailed {
            key: key.to_string(),
        })?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: SharedStore + ?Sized> SharedStore for std::rc::Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Auto-start that only remembers the last requested state.
#[derive(Debug, Default)]
pub struct NoAutoStart {
    enabled: Mutex<bool>,
}

impl NoAutoStart {
    pub fn is_enabled(&self) -> bool {
        self.enabled.lock().map(|e| *e).unwrap_or(false)
    }
}

impl AutoStart for NoAutoStart {
    fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        if let Ok(mut current) = self.enabled.lock() {
            *current = enabled;
        }
        Ok(())
    }
}

impl<T: AutoStart + ?Sized> AutoStart for std::rc::Rc<T> {
    fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        (**self).set_enabled(enabled)
    }
}
