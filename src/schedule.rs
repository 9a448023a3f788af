//! Work-hours gate
//!
//! A run proceeds only on a configured work day and within
//! [`WINDOW_MINUTES`] of one of the configured checkpoint times.

use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::config::Config;

/// Half-width of the window around each checkpoint, inclusive
pub const WINDOW_MINUTES: i64 = 30;

/// Decide whether a run should proceed at `now`
pub fn should_run(config: &Config, now: NaiveDateTime, force: bool) -> bool {
    if force {
        debug!("Schedule gate bypassed by --force");
        return true;
    }

    let weekday = now.format("%A").to_string();
    if !config.work_days.iter().any(|day| day == &weekday) {
        debug!("{} is not a configured work day", weekday);
        return false;
    }

    let current = now.time();
    config
        .schedule
        .iter()
        .filter_map(|checkpoint| parse_checkpoint(checkpoint))
        .any(|checkpoint| within_window(checkpoint, current))
}

/// Parse an "HH:MM" checkpoint, logging and discarding malformed entries
fn parse_checkpoint(checkpoint: &str) -> Option<NaiveTime> {
    match NaiveTime::parse_from_str(checkpoint.trim(), "%H:%M") {
        Ok(time) => Some(time),
        Err(e) => {
            warn!("Ignoring invalid schedule entry {:?}: {}", checkpoint, e);
            None
        }
    }
}

// Same-day difference; the window does not wrap around midnight.
fn within_window(checkpoint: NaiveTime, current: NaiveTime) -> bool {
    let diff = current.signed_duration_since(checkpoint).num_seconds().abs();
    diff <= WINDOW_MINUTES * 60
}
