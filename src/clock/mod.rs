//! Millisecond wall-clock used for GUI throttling and emitted-record timestamps.
//!
//! The clock is a trait object so the throttle window and timestamp prefixes are
//! testable; production code uses [SystemClock], tests step a [ManualClock] by hand.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait WallClock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }

    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }
}

impl WallClock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}
