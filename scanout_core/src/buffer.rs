// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer-queue contract.
//!
//! The buffers a surface presents live in a small ring owned by a buffer-queue
//! subsystem. The surface sits on the *consumer* side of that queue: it
//! acquires the buffer the GPU most recently finished queueing, holds it while
//! the display reads it, and releases it (with a release fence) once a newer
//! buffer has superseded it on screen.
//!
//! The core never allocates buffers; it only tracks which [`SlotIndex`] is
//! active.

use core::fmt;

use kurbo::Rect;

use crate::fence::FenceHandle;

/// Index of a buffer slot within the queue's ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(pub u8);

impl fmt::Debug for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotIndex({})", self.0)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque identity of the graphics buffer currently bound to a slot.
///
/// A queue may reallocate the buffer behind a slot (for example after a
/// resize); the id changes when that happens.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BufferId(pub u64);

/// Pixel dimensions of a surface and of the buffers backing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Creates a size from a width and height in pixels.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the surface bounds as a rectangle anchored at the origin.
    #[must_use]
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A buffer handed to the surface by [`BufferQueue::acquire`].
#[derive(Clone, Debug)]
pub struct AcquiredBuffer {
    /// Slot the buffer occupies.
    pub slot: SlotIndex,
    /// Identity of the buffer in that slot.
    pub buffer: BufferId,
    /// Signals when the producer (usually the GPU) has finished writing.
    pub acquire_fence: FenceHandle,
}

/// Errors reported by a [`BufferQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// No new buffer has been queued since the last acquisition. The surface
    /// keeps presenting its current buffer.
    NoBufferAvailable,
    /// The queue did not become ready in time.
    Timeout,
    /// The producer side disconnected.
    Abandoned,
    /// The given slot is not held by the consumer.
    InvalidSlot(SlotIndex),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBufferAvailable => f.write_str("no buffer available"),
            Self::Timeout => f.write_str("buffer queue timed out"),
            Self::Abandoned => f.write_str("buffer queue abandoned"),
            Self::InvalidSlot(slot) => write!(f, "slot {slot} is not held by the consumer"),
        }
    }
}

impl core::error::Error for QueueError {}

/// Consumer-side view of a rotating set of presentable buffers.
pub trait BufferQueue {
    /// Number of slots in the ring.
    fn slot_count(&self) -> usize;

    /// Reports whether the queue can currently service a frame.
    ///
    /// Must not block. [`QueueError::NoBufferAvailable`] is not a readiness
    /// failure and should not be returned here.
    fn check_ready(&self) -> Result<(), QueueError>;

    /// Acquires the most recently queued buffer.
    ///
    /// Returns [`QueueError::NoBufferAvailable`] when nothing new was queued.
    fn acquire(&mut self) -> Result<AcquiredBuffer, QueueError>;

    /// Returns a slot to the producer. The producer must not write into the
    /// buffer until `release_fence` signals.
    fn release(&mut self, slot: SlotIndex, release_fence: FenceHandle) -> Result<(), QueueError>;

    /// Sets the size of buffers allocated from now on.
    fn set_default_size(&mut self, size: SurfaceSize);
}
