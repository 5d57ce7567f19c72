//! Bucket width and tick rounding

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bucket width: 10 minutes
pub const DEFAULT_WINDOW_MS: i64 = 600_000;

/// Window construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window must be positive, got {0} ms")]
    NotPositive(i64),
}

/// Width of a decimation bucket in milliseconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Window(i64);

impl Window {
    pub fn new(millis: i64) -> Result<Self, WindowError> {
        if millis <= 0 {
            return Err(WindowError::NotPositive(millis));
        }
        Ok(Self(millis))
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Tick of the bucket `tstamp` falls into
    pub fn tick(self, tstamp: i64) -> i64 {
        nearest_tick(tstamp, self.0)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self(DEFAULT_WINDOW_MS)
    }
}

impl TryFrom<i64> for Window {
    type Error = WindowError;

    fn try_from(millis: i64) -> Result<Self, Self::Error> {
        Self::new(millis)
    }
}

impl From<Window> for i64 {
    fn from(window: Window) -> Self {
        window.0
    }
}

/// Round `t` to the nearest multiple of `w`, halves rounding up.
///
/// `round(t / w) * w` where a value exactly half a window past a tick goes
/// to the next tick (toward positive infinity, also for negative `t`).
/// Computed in integer arithmetic so large timestamps stay exact. `w` must be
/// positive.
pub fn nearest_tick(t: i64, w: i64) -> i64 {
    debug_assert!(w > 0, "window must be positive");
    let (t, w) = (t as i128, w as i128);
    let tick = (2 * t + w).div_euclid(2 * w) * w;
    tick.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
