//! Sync timing utilities for the periodic trigger
//!
//! Pure functions that can be tested without a running timer.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Check if enough time has elapsed since the last sync to allow a new one.
///
/// # Arguments
/// * `last_sync_at` - When the last successful sync completed (None if never synced)
/// * `interval` - Minimum time between syncs
pub fn cooldown_elapsed(last_sync_at: Option<DateTime<Utc>>, interval: Duration) -> bool {
    time_until_next_sync(last_sync_at, interval).is_zero()
}

/// How long to wait before the next periodic sync is due
pub fn time_until_next_sync(last_sync_at: Option<DateTime<Utc>>, interval: Duration) -> Duration {
    let Some(last) = last_sync_at else {
        return Duration::ZERO;
    };

    // A clock that went backwards counts as no time elapsed
    let elapsed = (Utc::now() - last).to_std().unwrap_or(Duration::ZERO);
    interval.saturating_sub(elapsed)
}
