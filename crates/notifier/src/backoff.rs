//! Fixed retry backoff schedule.
//!
//! The delay before the next attempt depends only on how many attempts have
//! failed so far. There is no jitter and no growth past the last tier.

use chrono::TimeDelta;

/// Delay before the next attempt, indexed by the retry count *after* the
/// failed attempt has been counted:
///
/// | retry_count | delay      |
/// |-------------|------------|
/// | 1           | 5 minutes  |
/// | 2           | 15 minutes |
/// | 3           | 1 hour     |
/// | 4+          | 24 hours   |
pub fn retry_delay(retry_count: i32) -> TimeDelta {
    match retry_count {
        i32::MIN..=1 => TimeDelta::minutes(5),
        2 => TimeDelta::minutes(15),
        3 => TimeDelta::hours(1),
        _ => TimeDelta::hours(24),
    }
}
