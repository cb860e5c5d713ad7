//! Global hotkey table.
//!
//! Maps the integer ids handed to the OS back to device identifiers and
//! keeps OS registrations in step with settings.

use super::binding::HotkeyBinding;
use super::HotkeyError;
use crate::settings::Settings;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// OS hotkey registration surface (RegisterHotKey/UnregisterHotKey).
pub trait HotkeyRegistrar {
    /// Register `(modifiers, virtual_key)` under `id`. Returns false when
    /// the OS refuses, e.g. because the combination is taken system-wide.
    fn register(&mut self, id: i32, modifiers: u32, virtual_key: u32) -> bool;

    /// Release the registration for `id`.
    fn unregister(&mut self, id: i32) -> bool;
}

pub struct HotkeyTable {
    registrar: Box<dyn HotkeyRegistrar>,
    registered: HashMap<i32, String>,
    next_id: i32,
}

impl HotkeyTable {
    pub fn new(registrar: Box<dyn HotkeyRegistrar>) -> Self {
        Self {
            registrar,
            registered: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register every enabled binding found in settings.
    ///
    /// Failures are logged and skipped; returns how many were registered.
    pub fn register_all(&mut self, settings: &Settings) -> usize {
        let mut count = 0;
        for (device_id, device) in &settings.device_settings {
            let Some(binding) = device.hotkey.binding() else {
                continue;
            };
            match self.register(device_id, &binding) {
                Ok(_) => count += 1,
                Err(e) => warn!(device = %device.device_name, "Skipping hotkey: {e}"),
            }
        }
        info!("Registered {count} global hotkey(s)");
        count
    }

    /// Register a binding for a device under a freshly allocated id.
    pub fn register(&mut self, device_id: &str, binding: &HotkeyBinding) -> Result<i32, HotkeyError> {
        let id = self.next_id;
        self.next_id += 1;

        if !self
            .registrar
            .register(id, binding.modifier_flags(), binding.virtual_key())
        {
            return Err(HotkeyError::RegistrationFailed(binding.to_string()));
        }

        debug!(id, %binding, device_id, "Registered hotkey");
        self.registered.insert(id, device_id.to_string());
        Ok(id)
    }

    /// Drop any registration held for `device_id`.
    pub fn unregister_device(&mut self, device_id: &str) {
        let ids: Vec<i32> = self
            .registered
            .iter()
            .filter(|(_, registered)| registered.as_str() == device_id)
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            self.registrar.unregister(id);
            self.registered.remove(&id);
            debug!(id, device_id, "Unregistered hotkey");
        }
    }

    /// Replace a device's binding: unregister the old one, then register
    /// the new one if enabled.
    pub fn update(
        &mut self,
        device_id: &str,
        binding: Option<&HotkeyBinding>,
    ) -> Result<Option<i32>, HotkeyError> {
        self.unregister_device(device_id);
        binding.map(|b| self.register(device_id, b)).transpose()
    }

    /// Device bound to an OS-delivered hotkey id.
    pub fn device_for(&self, id: i32) -> Option<&str> {
        self.registered.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Release every outstanding registration.
    pub fn unregister_all(&mut self) {
        for (id, _) in self.registered.drain() {
            self.registrar.unregister(id);
        }
    }
}

impl Drop for HotkeyTable {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{HotkeySettings, Modifier};
    use crate::settings::DeviceSettings;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[derive(Default)]
    struct OsState {
        active: HashMap<i32, (u32, u32)>,
        taken: HashSet<(u32, u32)>,
    }

    struct FakeRegistrar(Rc<RefCell<OsState>>);

    impl HotkeyRegistrar for FakeRegistrar {
        fn register(&mut self, id: i32, modifiers: u32, virtual_key: u32) -> bool {
            let mut os = self.0.borrow_mut();
            if os.taken.contains(&(modifiers, virtual_key)) || os.active.contains_key(&id) {
                return false;
            }
            os.active.insert(id, (modifiers, virtual_key));
            true
        }

        fn unregister(&mut self, id: i32) -> bool {
            self.0.borrow_mut().active.remove(&id).is_some()
        }
    }

    fn table() -> (HotkeyTable, Rc<RefCell<OsState>>) {
        let os = Rc::new(RefCell::new(OsState::default()));
        (HotkeyTable::new(Box::new(FakeRegistrar(os.clone()))), os)
    }

    fn ctrl(key: &str) -> HotkeyBinding {
        HotkeyBinding::new(&[Modifier::Ctrl], key).unwrap()
    }

    #[test]
    fn activation_resolves_device() {
        let (mut table, _os) = table();
        let id = table.register("dev-a", &ctrl("1")).unwrap();
        assert_eq!(table.device_for(id), Some("dev-a"));
        assert_eq!(table.device_for(id + 100), None);
    }

    #[test]
    fn ids_are_not_reused() {
        let (mut table, _os) = table();
        let first = table.register("dev-a", &ctrl("1")).unwrap();
        table.unregister_device("dev-a");
        let second = table.register("dev-a", &ctrl("1")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn conflict_skips_only_that_binding() {
        let (mut table, os) = table();
        os.borrow_mut()
            .taken
            .insert((ctrl("2").modifier_flags(), ctrl("2").virtual_key()));

        let mut settings = Settings::default();
        for (id, key) in [("dev-a", "1"), ("dev-b", "2"), ("dev-c", "3")] {
            let mut device = DeviceSettings::new(id, id);
            device.hotkey = HotkeySettings::from(Some(&ctrl(key)));
            settings.device_settings.insert(id.to_string(), device);
        }

        assert_eq!(table.register_all(&settings), 2);
        assert_eq!(os.borrow().active.len(), 2);
    }

    #[test]
    fn update_replaces_previous_registration() {
        let (mut table, os) = table();
        let old = table.register("dev-a", &ctrl("1")).unwrap();

        let new = table.update("dev-a", Some(&ctrl("9"))).unwrap().unwrap();
        assert_eq!(table.device_for(old), None);
        assert_eq!(table.device_for(new), Some("dev-a"));
        assert_eq!(os.borrow().active.len(), 1);

        assert_eq!(table.update("dev-a", None).unwrap(), None);
        assert!(table.is_empty());
        assert!(os.borrow().active.is_empty());
    }

    #[test]
    fn drop_releases_everything() {
        let (mut table, os) = table();
        table.register("dev-a", &ctrl("1")).unwrap();
        table.register("dev-b", &ctrl("2")).unwrap();
        drop(table);
        assert!(os.borrow().active.is_empty());
    }
}
