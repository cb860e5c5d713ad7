//! Cross-process command channel over the shared store.
//!
//! Other programs write a short device id (`D1`, `D2`, ...) into
//! `SwitchToAudioDevice`; the poll consumes it and resets the slot to
//! `"XX"`. The current device is published under `CurrentAudioDevice`
//! and `CurrentAudioDeviceID`.
//!
//! There is no queue: commands written faster than the poll interval
//! overwrite each other.

use crate::platform::{SharedStore, StoreError};
use crate::settings::Settings;
use tracing::{debug, info, warn};

pub const CURRENT_DEVICE_VALUE: &str = "CurrentAudioDevice";
pub const CURRENT_ID_VALUE: &str = "CurrentAudioDeviceID";
pub const SWITCH_VALUE: &str = "SwitchToAudioDevice";

/// Idle marker in the command slot.
pub const SENTINEL: &str = "XX";

/// Published when no device is default.
const NONE: &str = "None";

/// A consumed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The short id named a currently available device.
    Resolved { short_id: String, device_id: String },
    /// Nothing matched; the slot was still reset.
    Unknown { short_id: String },
}

/// Read the command slot once.
///
/// `available` holds the identifiers from the latest enumeration; a short
/// id for a device that is not present does not resolve. Any non-idle
/// value is reset to the sentinel before returning.
pub fn poll(
    store: &dyn SharedStore,
    settings: &Settings,
    available: &[&str],
) -> Result<Option<CommandOutcome>, StoreError> {
    let Some(raw) = store.get(SWITCH_VALUE)? else {
        return Ok(None);
    };

    let short_id = raw.trim();
    if short_id.is_empty() || short_id == SENTINEL {
        return Ok(None);
    }

    let short_id = short_id.to_string();
    // Consume before acting so the command cannot replay
    store.set(SWITCH_VALUE, SENTINEL)?;
    debug!(%short_id, "Consumed switch command");

    let outcome = match settings
        .device_for_short_id(&short_id)
        .filter(|id| available.contains(id))
    {
        Some(device_id) => CommandOutcome::Resolved {
            short_id,
            device_id: device_id.to_string(),
        },
        None => {
            warn!(%short_id, "Switch command names no available device");
            CommandOutcome::Unknown { short_id }
        }
    };

    Ok(Some(outcome))
}

/// Publish the current default device for external readers, and create
/// the command slot if it does not exist yet.
pub fn publish_current(
    store: &dyn SharedStore,
    device_name: Option<&str>,
    short_id: Option<&str>,
) -> Result<(), StoreError> {
    let name = device_name.unwrap_or(NONE);
    let short_id = short_id.filter(|s| !s.is_empty()).unwrap_or(NONE);

    store.set(CURRENT_DEVICE_VALUE, name)?;
    store.set(CURRENT_ID_VALUE, short_id)?;

    if store.get(SWITCH_VALUE)?.is_none() {
        store.set(SWITCH_VALUE, SENTINEL)?;
        info!("Initialized command slot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use pretty_assertions::assert_eq;

    fn settings_with(devices: &[(&str, &str)]) -> Settings {
        let mut settings = Settings::default();
        for (id, name) in devices {
            settings.observe_device(id, name);
        }
        settings
    }

    fn slot(store: &MemoryStore) -> Option<String> {
        store.get(SWITCH_VALUE).unwrap()
    }

    #[test]
    fn sentinel_is_a_no_op() {
        let store = MemoryStore::new();
        store.set(SWITCH_VALUE, SENTINEL).unwrap();
        let settings = settings_with(&[("a", "A")]);

        assert_eq!(poll(&store, &settings, &["a"]).unwrap(), None);
        assert_eq!(slot(&store).as_deref(), Some(SENTINEL));
    }

    #[test]
    fn missing_or_blank_slot_is_idle() {
        let store = MemoryStore::new();
        let settings = settings_with(&[("a", "A")]);
        assert_eq!(poll(&store, &settings, &["a"]).unwrap(), None);
        assert_eq!(slot(&store), None);

        store.set(SWITCH_VALUE, "  ").unwrap();
        assert_eq!(poll(&store, &settings, &["a"]).unwrap(), None);
    }

    #[test]
    fn valid_short_id_resolves_and_resets() {
        let store = MemoryStore::new();
        let settings = settings_with(&[("a", "A"), ("b", "B")]);
        store.set(SWITCH_VALUE, "D2").unwrap();

        let outcome = poll(&store, &settings, &["a", "b"]).unwrap();
        assert_eq!(
            outcome,
            Some(CommandOutcome::Resolved {
                short_id: "D2".into(),
                device_id: "b".into(),
            })
        );
        assert_eq!(slot(&store).as_deref(), Some(SENTINEL));

        // Consumed: the next poll sees nothing
        assert_eq!(poll(&store, &settings, &["a", "b"]).unwrap(), None);
    }

    #[test]
    fn unknown_short_id_resets_without_resolving() {
        let store = MemoryStore::new();
        let settings = settings_with(&[("a", "A")]);
        store.set(SWITCH_VALUE, "D9").unwrap();

        assert_eq!(
            poll(&store, &settings, &["a"]).unwrap(),
            Some(CommandOutcome::Unknown {
                short_id: "D9".into()
            })
        );
        assert_eq!(slot(&store).as_deref(), Some(SENTINEL));
    }

    #[test]
    fn absent_device_does_not_resolve() {
        let store = MemoryStore::new();
        let settings = settings_with(&[("a", "A"), ("b", "B")]);
        store.set(SWITCH_VALUE, "D2").unwrap();

        assert!(matches!(
            poll(&store, &settings, &["a"]).unwrap(),
            Some(CommandOutcome::Unknown { .. })
        ));
    }

    #[test]
    fn publish_writes_current_device_and_initializes_slot() {
        let store = MemoryStore::new();
        publish_current(&store, Some("Speakers"), Some("D1")).unwrap();

        assert_eq!(
            store.get(CURRENT_DEVICE_VALUE).unwrap().as_deref(),
            Some("Speakers")
        );
        assert_eq!(store.get(CURRENT_ID_VALUE).unwrap().as_deref(), Some("D1"));
        assert_eq!(slot(&store).as_deref(), Some(SENTINEL));

        // An existing command is left alone
        store.set(SWITCH_VALUE, "D3").unwrap();
        publish_current(&store, None, None).unwrap();
        assert_eq!(store.get(CURRENT_DEVICE_VALUE).unwrap().as_deref(), Some("None"));
        assert_eq!(store.get(CURRENT_ID_VALUE).unwrap().as_deref(), Some("None"));
        assert_eq!(slot(&store).as_deref(), Some("D3"));
    }
}
