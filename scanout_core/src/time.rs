// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fence timestamps.
//!
//! A fence records when it signaled as a [`HostTime`] in whatever monotonic
//! tick unit the platform's sync primitives use. Diagnostics convert ticks to
//! wall-clock units through a [`Timebase`].

use core::fmt;

/// Monotonic tick count at which something happened.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Raw ticks.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Ticks-to-nanoseconds ratio, `numer / denom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Nanoseconds per `denom` ticks.
    pub numer: u32,
    /// Must not be zero.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Converts `ticks` to nanoseconds, saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    pub fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = u128::from(ticks) * u128::from(self.numer) / u128::from(self.denom);
        u64::try_from(wide).unwrap_or(u64::MAX)
    }
}
