//! Wall-clock source for archive filenames.

use std::cell::Cell;

use time::OffsetDateTime;

pub trait Clock {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> f64 {
        OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
    }
}

/// Starts at `start` and advances by `step` on every read.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    next: Cell<f64>,
    step: f64,
}

impl SteppingClock {
    pub fn new(start: f64, step: f64) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now_unix(&self) -> f64 {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}

/// Unix seconds rounded to two decimals, as shown in archive names.
pub fn rounded_timestamp(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
