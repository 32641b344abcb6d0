//! Time sources.
//!
//! Everything time-gated in the engine (NPC turn throttling, path staleness,
//! move cooldowns, hunger, world age) reads a [`Clock`] that reports the time
//! elapsed since the world was created. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] by hand so that behavior is
//! reproducible.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Elapsed time since world creation.
pub trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
}

/// Wall-clock time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an absolute elapsed time. Going backwards is allowed; callers
    /// that depend on monotonic time must not do it.
    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }
}
