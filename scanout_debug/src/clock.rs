// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timestamp sources for sinks.

use std::time::Instant;

use scanout_core::time::HostTime;

/// Supplies the time at which a sink received an event.
pub trait Clock: std::fmt::Debug {
    /// Returns the current time.
    fn now(&mut self) -> HostTime;
}

/// Nanoseconds elapsed since the clock was created.
///
/// Ticks are nanoseconds, so readings pair with
/// [`Timebase::NANOS`](scanout_core::time::Timebase::NANOS).
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Starts a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> HostTime {
        // Saturates after ~584 years of uptime.
        HostTime(u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX))
    }
}

/// A clock that advances by a fixed step on every reading.
///
/// Makes recordings reproducible in tests and simulations.
#[derive(Clone, Copy, Debug)]
pub struct SteppingClock {
    next: u64,
    step: u64,
}

impl SteppingClock {
    /// Creates a clock whose first reading is `start`.
    #[must_use]
    pub const fn new(start: u64, step: u64) -> Self {
        Self { next: start, step }
    }
}

impl Clock for SteppingClock {
    fn now(&mut self) -> HostTime {
        let t = self.next;
        self.next = self.next.saturating_add(self.step);
        HostTime(t)
    }
}
