// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Active-slot and release-fence bookkeeping shared by all surface variants.

use crate::buffer::{AcquiredBuffer, BufferId, BufferQueue, QueueError, SlotIndex};
use crate::fence::FenceHandle;

/// The buffer the surface is presenting (or about to present).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ActiveBuffer {
    pub(crate) slot: SlotIndex,
    pub(crate) buffer: BufferId,
}

/// Tracks the current slot, its acquire fence, and the superseded slot that
/// still waits for a release fence.
///
/// Invariant: `pending_release` is only ever set between a successful
/// acquisition and the next commit, and never equals the current slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct SlotTracker {
    current: Option<ActiveBuffer>,
    acquire_fence: FenceHandle,
    pending_release: Option<SlotIndex>,
    /// The current buffer was rendered for an older geometry and may only be
    /// replaced, never handed off again.
    stale: bool,
}

impl SlotTracker {
    pub(crate) fn current(&self) -> Option<ActiveBuffer> {
        self.current
    }

    pub(crate) fn acquire_fence(&self) -> &FenceHandle {
        &self.acquire_fence
    }

    pub(crate) fn pending_release(&self) -> Option<SlotIndex> {
        self.pending_release
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale
    }

    /// Forgets the acquire fence and stops the current buffer from being
    /// reused until the queue delivers a new one.
    pub(crate) fn invalidate(&mut self) {
        self.acquire_fence = FenceHandle::NO_FENCE;
        self.stale = true;
    }

    /// Acquires the next buffer to present, falling back to the current one
    /// when nothing new was queued and the current one is not stale.
    ///
    /// Returns the buffer to hand off plus a checkpoint for [`rollback`].
    ///
    /// [`rollback`]: Self::rollback
    pub(crate) fn acquire_next<Q: BufferQueue>(
        &mut self,
        queue: &mut Q,
    ) -> Result<(ActiveBuffer, Checkpoint), QueueError> {
        debug_assert!(
            self.pending_release.is_none(),
            "previous frame was not committed"
        );
        let checkpoint = Checkpoint {
            saved: self.clone(),
            fresh: None,
        };
        match queue.acquire() {
            Ok(AcquiredBuffer {
                slot,
                buffer,
                acquire_fence,
            }) => {
                debug_assert!(
                    usize::from(slot.0) < queue.slot_count(),
                    "queue handed out {slot} beyond its {} slots",
                    queue.slot_count()
                );
                if let Some(prev) = self.current
                    && prev.slot != slot
                {
                    self.pending_release = Some(prev.slot);
                }
                let active = ActiveBuffer { slot, buffer };
                self.current = Some(active);
                self.acquire_fence = acquire_fence;
                self.stale = false;
                Ok((
                    active,
                    Checkpoint {
                        fresh: Some(slot),
                        ..checkpoint
                    },
                ))
            }
            Err(QueueError::NoBufferAvailable) => match self.current {
                Some(active) if !self.stale => Ok((active, checkpoint)),
                _ => Err(QueueError::NoBufferAvailable),
            },
            Err(e) => Err(e),
        }
    }

    /// Undoes an acquisition whose handoff failed.
    ///
    /// A freshly acquired buffer was never read by the composer, so it goes
    /// straight back to the queue without a fence. The previously current
    /// buffer is still on screen and stays held.
    pub(crate) fn rollback<Q: BufferQueue>(&mut self, queue: &mut Q, checkpoint: Checkpoint) {
        let Checkpoint { saved, fresh } = checkpoint;
        let Some(fresh) = fresh else {
            return;
        };
        if saved.current.is_some_and(|cur| cur.slot == fresh) {
            // The queue handed back the slot we already held; it is on screen
            // and cannot be returned.
            self.pending_release = saved.pending_release;
            return;
        }
        // The slot was acquired a moment ago, so the queue cannot reject it.
        _ = queue.release(fresh, FenceHandle::NO_FENCE);
        *self = saved;
    }

    /// Takes the superseded slot awaiting release, if any.
    pub(crate) fn take_pending_release(&mut self) -> Option<SlotIndex> {
        self.pending_release.take()
    }
}

/// State captured before an acquisition so a failed handoff can be undone.
#[derive(Debug)]
pub(crate) struct Checkpoint {
    saved: SlotTracker,
    fresh: Option<SlotIndex>,
}
