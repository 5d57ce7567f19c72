//! Server-side timestamp assignment

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Timestamp for the next insert given the last one handed out.
///
/// Follows the wall clock, but never repeats or goes backwards: two writes
/// in the same millisecond, or a clock step backwards, get `last + 1`.
pub fn next_tstamp(last: i64, now: i64) -> i64 {
    now.max(last.saturating_add(1))
}
