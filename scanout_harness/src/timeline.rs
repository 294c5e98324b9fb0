// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated time and the fences that live on it.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use scanout_core::fence::{Fence, FenceHandle};
use scanout_core::time::HostTime;

/// A shared, manually advanced clock.
///
/// Every fence created from a timeline signals once the timeline reaches the
/// fence's time. Clones share the same clock.
#[derive(Clone, Debug, Default)]
pub struct FenceTimeline {
    now: Arc<AtomicU64>,
}

impl FenceTimeline {
    /// Creates a timeline at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        HostTime(self.now.load(Ordering::Acquire))
    }

    /// Moves the clock forward by `ticks` and returns the new time.
    pub fn advance(&self, ticks: u64) -> HostTime {
        let prev = self.now.fetch_add(ticks, Ordering::AcqRel);
        HostTime(prev.saturating_add(ticks))
    }

    /// Moves the clock to `t` unless it is already past it.
    pub fn advance_to(&self, t: HostTime) {
        self.now.fetch_max(t.ticks(), Ordering::AcqRel);
    }

    /// A fence that signals at `at`.
    #[must_use]
    pub fn fence_at(&self, at: HostTime) -> FenceHandle {
        FenceHandle::new(Arc::new(SimFence {
            now: self.now.clone(),
            at: at.ticks(),
        }))
    }

    /// A fence that signals `delay` ticks from now.
    #[must_use]
    pub fn fence_after(&self, delay: u64) -> FenceHandle {
        self.fence_at(HostTime(self.now().ticks().saturating_add(delay)))
    }
}

#[derive(Debug)]
struct SimFence {
    now: Arc<AtomicU64>,
    at: u64,
}

impl Fence for SimFence {
    fn is_signaled(&self) -> bool {
        self.now.load(Ordering::Acquire) >= self.at
    }

    fn signal_time(&self) -> Option<HostTime> {
        self.is_signaled().then_some(HostTime(self.at))
    }
}
