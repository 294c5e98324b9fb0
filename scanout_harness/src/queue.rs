// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated buffer queue.
//!
//! [`SimBufferQueue`] is a cloneable handle: the surface owns one clone as its
//! consumer end, and the test keeps another to play the producer (the GPU).
//! The producer may only reuse a slot once the release fence that came back
//! with it has signaled, so release-fence mistakes show up as producer stalls.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use scanout_core::buffer::{
    AcquiredBuffer, BufferId, BufferQueue, QueueError, SlotIndex, SurfaceSize,
};
use scanout_core::fence::FenceHandle;

use crate::timeline::FenceTimeline;

/// Parameters for a [`SimBufferQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimQueueConfig {
    /// Number of slots in the ring.
    pub slots: u8,
    /// Ticks between queueing a buffer and its acquire fence signaling.
    pub render_ticks: u64,
}

impl SimQueueConfig {
    /// Two slots, rendering finishes instantly.
    pub const DOUBLE: Self = Self {
        slots: 2,
        render_ticks: 0,
    };

    /// Three slots, rendering finishes instantly.
    pub const TRIPLE: Self = Self {
        slots: 3,
        render_ticks: 0,
    };

    /// Sets the render latency.
    #[must_use]
    pub const fn with_render_ticks(mut self, ticks: u64) -> Self {
        self.render_ticks = ticks;
        self
    }
}

impl Default for SimQueueConfig {
    fn default() -> Self {
        Self::TRIPLE
    }
}

/// Counters kept by a [`SimBufferQueue`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Buffers the producer queued.
    pub queued: u64,
    /// Buffers the consumer acquired.
    pub acquired: u64,
    /// Buffers the consumer released.
    pub released: u64,
    /// Releases that came without a fence.
    pub released_unfenced: u64,
    /// Releases of slots the consumer did not hold.
    pub rejected_releases: u64,
    /// Times the producer found no reusable slot.
    pub producer_stalls: u64,
}

#[derive(Clone, Debug)]
enum Slot {
    /// Owned by the producer once `release` signals.
    Free { release: FenceHandle },
    Queued,
    Acquired,
}

#[derive(Debug)]
struct QueueState {
    config: SimQueueConfig,
    slots: Vec<Slot>,
    queued: VecDeque<(SlotIndex, FenceHandle)>,
    cursor: usize,
    generation: u64,
    default_size: SurfaceSize,
    readiness: Result<(), QueueError>,
    stats: QueueStats,
}

/// A deterministic in-memory [`BufferQueue`].
#[derive(Clone, Debug)]
pub struct SimBufferQueue {
    state: Rc<RefCell<QueueState>>,
    timeline: FenceTimeline,
}

impl SimBufferQueue {
    /// Creates a queue whose fences live on `timeline`.
    #[must_use]
    pub fn new(config: SimQueueConfig, timeline: FenceTimeline) -> Self {
        let slots = (0..config.slots)
            .map(|_| Slot::Free {
                release: FenceHandle::NO_FENCE,
            })
            .collect();
        Self {
            state: Rc::new(RefCell::new(QueueState {
                config,
                slots,
                queued: VecDeque::new(),
                cursor: 0,
                generation: 0,
                default_size: SurfaceSize::default(),
                readiness: Ok(()),
                stats: QueueStats::default(),
            })),
            timeline,
        }
    }

    // -- producer side -----------------------------------------------------

    /// Renders and queues a frame into the next reusable slot.
    ///
    /// Returns `None` (and counts a stall) if every slot is either held by
    /// the consumer or still guarded by an unsignaled release fence.
    pub fn queue_frame(&self) -> Option<SlotIndex> {
        let mut state = self.state.borrow_mut();
        let n = state.slots.len();
        let reusable = (0..n).map(|i| (state.cursor + i) % n).find(|&i| {
            matches!(&state.slots[i], Slot::Free { release } if release.is_signaled())
        });
        let Some(index) = reusable else {
            state.stats.producer_stalls += 1;
            return None;
        };
        let slot = SlotIndex(u8::try_from(index).ok()?);
        state.cursor = (index + 1) % n;
        state.slots[index] = Slot::Queued;
        let fence = self.timeline.fence_after(state.config.render_ticks);
        state.queued.push_back((slot, fence));
        state.stats.queued += 1;
        Some(slot)
    }

    /// Makes [`BufferQueue::check_ready`] report `readiness`.
    pub fn set_readiness(&self, readiness: Result<(), QueueError>) {
        self.state.borrow_mut().readiness = readiness;
    }

    // -- inspection --------------------------------------------------------

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.state.borrow().stats
    }

    /// Size the next allocated buffers will have.
    #[must_use]
    pub fn default_size(&self) -> SurfaceSize {
        self.state.borrow().default_size
    }

    /// Number of slots the consumer currently holds.
    #[must_use]
    pub fn held_by_consumer(&self) -> usize {
        let state = self.state.borrow();
        state
            .slots
            .iter()
            .filter(|s| matches!(s, Slot::Acquired))
            .count()
    }
}

impl BufferQueue for SimBufferQueue {
    fn slot_count(&self) -> usize {
        self.state.borrow().slots.len()
    }

    fn check_ready(&self) -> Result<(), QueueError> {
        self.state.borrow().readiness
    }

    fn acquire(&mut self) -> Result<AcquiredBuffer, QueueError> {
        let mut state = self.state.borrow_mut();
        state.readiness?;
        let (slot, acquire_fence) = state
            .queued
            .pop_front()
            .ok_or(QueueError::NoBufferAvailable)?;
        state.slots[usize::from(slot.0)] = Slot::Acquired;
        state.stats.acquired += 1;
        Ok(AcquiredBuffer {
            slot,
            buffer: BufferId((state.generation << 8) | u64::from(slot.0)),
            acquire_fence,
        })
    }

    fn release(&mut self, slot: SlotIndex, release_fence: FenceHandle) -> Result<(), QueueError> {
        let mut state = self.state.borrow_mut();
        let held = matches!(
            state.slots.get(usize::from(slot.0)),
            Some(Slot::Acquired)
        );
        if !held {
            state.stats.rejected_releases += 1;
            return Err(QueueError::InvalidSlot(slot));
        }
        state.stats.released += 1;
        if !release_fence.is_valid() {
            state.stats.released_unfenced += 1;
        }
        state.slots[usize::from(slot.0)] = Slot::Free {
            release: release_fence,
        };
        Ok(())
    }

    fn set_default_size(&mut self, size: SurfaceSize) {
        let mut state = self.state.borrow_mut();
        if state.default_size != size {
            state.generation += 1;
            state.default_size = size;
        }
    }
}
