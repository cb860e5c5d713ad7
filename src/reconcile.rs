//! Device list reconciliation.
//!
//! Keeps the displayed device list in step with the provider's active
//! set. Refresh triggers (timer, notifications, user actions) go through
//! [`RefreshQueue`] so at most one enumeration is in flight and bursts of
//! requests collapse into a single follow-up run.

use crate::audio::PlaybackDevice;
use crate::platform::icons::device_glyph;
use crate::settings::Settings;
use tracing::debug;

/// One row of the displayed device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedDevice {
    pub device_id: String,
    pub name: String,
    pub is_default: bool,
    pub short_id: String,
    pub remark: String,
    pub hotkey_label: String,
    pub glyph: String,
}

impl DisplayedDevice {
    fn from_fetched(device: &PlaybackDevice, settings: &Settings) -> Self {
        let mut row = Self {
            device_id: device.id.clone(),
            name: String::new(),
            is_default: false,
            short_id: String::new(),
            remark: String::new(),
            hotkey_label: String::new(),
            glyph: String::new(),
        };
        row.apply(device, settings);
        row
    }

    /// Copy fresh provider and settings data into the row. Returns true if
    /// anything visible changed.
    fn apply(&mut self, device: &PlaybackDevice, settings: &Settings) -> bool {
        let stored = settings.device(&device.id);
        let short_id = stored.and_then(|d| d.short_id()).unwrap_or_default();
        let remark = stored.map(|d| d.user_remark.as_str()).unwrap_or_default();
        let hotkey_label = stored
            .map(|d| d.hotkey.label())
            .unwrap_or_else(|| "None".to_string());
        let glyph = device_glyph(&device.name, stored.and_then(|d| d.custom_icon()));

        let changed = self.name != device.name
            || self.is_default != device.is_default
            || self.short_id != short_id
            || self.remark != remark
            || self.hotkey_label != hotkey_label
            || self.glyph != glyph;

        if changed {
            self.name = device.name.clone();
            self.is_default = device.is_default;
            self.short_id = short_id.to_string();
            self.remark = remark.to_string();
            self.hotkey_label = hotkey_label;
            self.glyph = glyph.to_string();
        }
        changed
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Fetched devices not shown because they are hidden.
    pub hidden_count: usize,
    /// Identifier of the provider's current default device.
    pub default_device: Option<String>,
    /// Settings were modified and should be persisted.
    pub settings_changed: bool,
}

/// Diff `fetched` against `displayed` by identifier and apply the result.
///
/// Displayed rows absent from `fetched`, or hidden in settings, are
/// removed. Visible fetched devices update their row in place or are
/// appended. Every fetched device, hidden or not, has its settings record
/// created and named and its short id assigned.
pub fn reconcile(
    displayed: &mut Vec<DisplayedDevice>,
    fetched: &[PlaybackDevice],
    settings: &mut Settings,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for device in fetched {
        report.settings_changed |= settings.observe_device(&device.id, &device.name);
    }

    let before = displayed.len();
    displayed.retain(|row| {
        fetched.iter().any(|d| d.id == row.device_id) && !settings.is_hidden(&row.device_id)
    });
    report.removed = before - displayed.len();

    for device in fetched {
        if device.is_default {
            report.default_device = Some(device.id.clone());
        }

        if settings.is_hidden(&device.id) {
            report.hidden_count += 1;
            continue;
        }

        match displayed.iter_mut().find(|row| row.device_id == device.id) {
            Some(row) => {
                if row.apply(device, settings) {
                    report.updated += 1;
                }
            }
            None => {
                displayed.push(DisplayedDevice::from_fetched(device, settings));
                report.added += 1;
            }
        }
    }

    debug!(
        added = report.added,
        updated = report.updated,
        removed = report.removed,
        hidden = report.hidden_count,
        "Reconciled device list"
    );
    report
}

/// Coalescing queue of "refresh requested" signals.
#[derive(Debug, Default)]
pub struct RefreshQueue {
    in_flight: bool,
    pending: bool,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. Returns true if the caller should start a run now.
    pub fn request(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Mark the running refresh finished. Returns true if exactly one
    /// follow-up run should start now.
    pub fn complete(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.in_flight = false;
            false
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dev(id: &str, name: &str) -> PlaybackDevice {
        PlaybackDevice::new(id, name)
    }

    fn ids(list: &[DisplayedDevice]) -> Vec<&str> {
        list.iter().map(|r| r.device_id.as_str()).collect()
    }

    #[test]
    fn first_pass_appends_everything_visible() {
        let mut settings = Settings::default();
        let mut list = Vec::new();
        let fetched = vec![dev("a", "Speakers").with_default(true), dev("b", "Headphones")];

        let report = reconcile(&mut list, &fetched, &mut settings);

        assert_eq!(ids(&list), vec!["a", "b"]);
        assert_eq!(report.added, 2);
        assert_eq!(report.default_device.as_deref(), Some("a"));
        assert!(report.settings_changed);
        assert_eq!(list[0].short_id, "D1");
        assert_eq!(list[1].glyph, "🎧");
        assert_eq!(list[1].hotkey_label, "None");
    }

    #[test]
    fn removal_addition_and_rename() {
        let mut settings = Settings::default();
        let mut list = Vec::new();
        reconcile(&mut list, &[dev("a", "A"), dev("b", "B")], &mut settings);

        let report = reconcile(&mut list, &[dev("b", "B renamed"), dev("c", "C")], &mut settings);

        assert_eq!(ids(&list), vec!["b", "c"]);
        assert_eq!(list[0].name, "B renamed");
        assert_eq!(
            (report.added, report.updated, report.removed),
            (1, 1, 1)
        );
    }

    #[test]
    fn hidden_devices_keep_settings_but_are_not_shown() {
        let mut settings = Settings::default();
        let mut list = Vec::new();
        let fetched = vec![dev("a", "A"), dev("b", "B")];
        reconcile(&mut list, &fetched, &mut settings);

        let b = settings.device_mut("b").unwrap();
        b.is_hidden = true;
        b.user_remark = "spare".into();
        let short = b.simplified_id.clone();

        for _ in 0..3 {
            let report = reconcile(&mut list, &fetched, &mut settings);
            assert_eq!(report.hidden_count, 1);
            assert!(!report.settings_changed);
        }

        assert_eq!(ids(&list), vec!["a"]);
        let b = settings.device("b").unwrap();
        assert_eq!(b.user_remark, "spare");
        assert_eq!(b.simplified_id, short);
    }

    #[test]
    fn unchanged_pass_reports_nothing() {
        let mut settings = Settings::default();
        let mut list = Vec::new();
        let fetched = vec![dev("a", "A")];
        reconcile(&mut list, &fetched, &mut settings);

        let report = reconcile(&mut list, &fetched, &mut settings);
        assert_eq!(report, ReconcileReport::default());
    }

    #[test]
    fn result_matches_fetched_filtered_by_hidden_for_any_history() {
        let sets: Vec<Vec<PlaybackDevice>> = vec![
            vec![dev("a", "A"), dev("b", "B"), dev("c", "C")],
            vec![dev("c", "C2"), dev("d", "D")],
            vec![],
            vec![dev("b", "B"), dev("a", "A")],
            vec![dev("e", "E"), dev("a", "A3"), dev("c", "C")],
        ];

        // Every ordering of every pair of sets lands on the same final list.
        for before in &sets {
            for after in &sets {
                let mut settings = Settings::default();
                settings.observe_device("c", "C");
                settings.device_mut("c").unwrap().is_hidden = true;

                let mut list = Vec::new();
                reconcile(&mut list, before, &mut settings);
                reconcile(&mut list, after, &mut settings);

                let mut got: Vec<(String, String)> = list
                    .iter()
                    .map(|r| (r.device_id.clone(), r.name.clone()))
                    .collect();
                got.sort();

                let mut expected: Vec<(String, String)> = after
                    .iter()
                    .filter(|d| d.id != "c")
                    .map(|d| (d.id.clone(), d.name.clone()))
                    .collect();
                expected.sort();

                assert_eq!(got, expected);
            }
        }
    }

    #[test]
    fn hiding_a_displayed_device_removes_it() {
        let mut settings = Settings::default();
        let mut list = Vec::new();
        let fetched = vec![dev("a", "A"), dev("b", "B")];
        reconcile(&mut list, &fetched, &mut settings);

        settings.device_mut("a").unwrap().is_hidden = true;
        let report = reconcile(&mut list, &fetched, &mut settings);
        assert_eq!(report.removed, 1);
        assert_eq!(ids(&list), vec!["b"]);

        settings.device_mut("a").unwrap().is_hidden = false;
        let report = reconcile(&mut list, &fetched, &mut settings);
        assert_eq!(report.added, 1);
        assert_eq!(ids(&list), vec!["b", "a"]);
    }

    #[test]
    fn queue_coalesces_requests_while_in_flight() {
        let mut queue = RefreshQueue::new();
        assert!(queue.request());
        assert!(!queue.request());
        assert!(!queue.request());
        assert!(!queue.request());

        // One follow-up for the whole burst
        assert!(queue.complete());
        assert!(queue.is_in_flight());
        assert!(!queue.complete());
        assert!(!queue.is_in_flight());

        assert!(queue.request());
    }
}
