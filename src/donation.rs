//! Donation reminder scheduling.
//!
//! The first launch is recorded in the shared store. Once the app has
//! been in use for [`REMINDER_AFTER_DAYS`] days, each session shows a
//! single reminder after a short randomized delay.

use crate::platform::{SharedStore, StoreError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const FIRST_RUN_VALUE: &str = "FirstRunDate";
pub const REMINDER_AFTER_DAYS: i64 = 30;

const MIN_DELAY_SECS: u64 = 10;
const MAX_DELAY_SECS: u64 = 60;

pub const REMINDER_TITLE: &str = "Support Audio Device Switcher";
pub const REMINDER_TEXT: &str = "Thanks for using Audio Device Switcher for a while now!\n\n\
If it saves you time every day, please consider supporting its development with a donation.";

/// Read the first-run timestamp, writing `now` when missing or unparsable.
pub fn first_run(store: &dyn SharedStore, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
    if let Some(raw) = store.get(FIRST_RUN_VALUE)? {
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
            Err(e) => warn!(%raw, "Unparsable first-run date, resetting: {e}"),
        }
    } else {
        info!("Recording first run");
    }

    store.set(FIRST_RUN_VALUE, &now.to_rfc3339())?;
    Ok(now)
}

/// Delay before this session's reminder, or None if it is too early.
///
/// `seed` spreads the delay over 10..=60 seconds.
pub fn reminder_delay(first_run: DateTime<Utc>, now: DateTime<Utc>, seed: u64) -> Option<Duration> {
    let days = (now - first_run).num_days();
    if days < REMINDER_AFTER_DAYS {
        debug!(days, "Donation reminder not due yet");
        return None;
    }

    let span = MAX_DELAY_SECS - MIN_DELAY_SECS + 1;
    let delay = Duration::from_secs(MIN_DELAY_SECS + seed % span);
    info!(days, delay_secs = delay.as_secs(), "Donation reminder scheduled");
    Some(delay)
}

/// Check the store and schedule at most one reminder for this session.
pub fn schedule(store: &dyn SharedStore, now: DateTime<Utc>) -> Option<Duration> {
    let seed = now.timestamp_subsec_nanos() as u64;
    match first_run(store, now) {
        Ok(first) => reminder_delay(first, now, seed),
        Err(e) => {
            warn!("Donation check skipped: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use chrono::TimeZone;

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::days(days)
    }

    #[test]
    fn first_run_is_recorded_once() {
        let store = MemoryStore::new();
        assert_eq!(first_run(&store, at(0)).unwrap(), at(0));
        assert_eq!(first_run(&store, at(5)).unwrap(), at(0));
    }

    #[test]
    fn corrupt_first_run_resets_to_now() {
        let store = MemoryStore::new();
        store.set(FIRST_RUN_VALUE, "638400000000000000").unwrap();
        assert_eq!(first_run(&store, at(3)).unwrap(), at(3));
        assert_eq!(
            store.get(FIRST_RUN_VALUE).unwrap(),
            Some(at(3).to_rfc3339())
        );
    }

    #[test]
    fn reminder_only_after_thirty_days() {
        assert_eq!(reminder_delay(at(0), at(29), 0), None);
        assert_eq!(reminder_delay(at(0), at(30), 0), Some(Duration::from_secs(10)));
    }

    #[test]
    fn delay_stays_in_range() {
        for seed in [0, 1, 50, 51, 999_999_999, u64::MAX] {
            let delay = reminder_delay(at(0), at(45), seed).unwrap().as_secs();
            assert!((10..=60).contains(&delay), "{delay}");
        }
    }

    #[test]
    fn schedule_on_first_launch_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(schedule(&store, at(0)), None);
        assert!(schedule(&store, at(31)).is_some());
    }
}
