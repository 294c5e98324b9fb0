// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory queue and composer for unit tests.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::buffer::{AcquiredBuffer, BufferId, BufferQueue, QueueError, SlotIndex, SurfaceSize};
use crate::composer::{ClientTarget, Composer, ComposerError};
use crate::fence::FenceHandle;
use crate::fence::testing::ManualFence;
use crate::output::OutputId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Queued,
    Acquired,
}

/// A buffer queue whose producer side is driven by hand.
#[derive(Debug)]
pub(crate) struct TestQueue {
    slots: Vec<SlotState>,
    queued: VecDeque<(SlotIndex, FenceHandle)>,
    cursor: usize,
    generation: u64,
    released: Vec<(SlotIndex, bool)>,
    pub(crate) ready: Result<(), QueueError>,
    pub(crate) fail_acquire: Option<QueueError>,
    pub(crate) default_size: Option<SurfaceSize>,
}

impl TestQueue {
    pub(crate) fn with_slots(count: u8) -> Self {
        Self {
            slots: vec![SlotState::Free; usize::from(count)],
            queued: VecDeque::new(),
            cursor: 0,
            generation: 0,
            released: Vec::new(),
            ready: Ok(()),
            fail_acquire: None,
            default_size: None,
        }
    }

    /// Queues a frame into the next free slot, already signaled.
    pub(crate) fn queue_frame(&mut self) -> SlotIndex {
        self.queue_frame_with_fence(FenceHandle::NO_FENCE)
    }

    /// Queues a frame into the next free slot with the given acquire fence.
    pub(crate) fn queue_frame_with_fence(&mut self, fence: FenceHandle) -> SlotIndex {
        let n = self.slots.len();
        let index = (0..n)
            .map(|i| (self.cursor + i) % n)
            .find(|&i| self.slots[i] == SlotState::Free)
            .unwrap_or_else(|| panic!("no free slot among {n}"));
        self.cursor = (index + 1) % n;
        self.slots[index] = SlotState::Queued;
        let slot = SlotIndex(u8::try_from(index).unwrap());
        self.queued.push_back((slot, fence));
        slot
    }

    /// Every `release` call so far, with whether a real fence came along.
    pub(crate) fn released(&self) -> &[(SlotIndex, bool)] {
        &self.released
    }

    pub(crate) fn is_acquired(&self, slot: SlotIndex) -> bool {
        self.slots[usize::from(slot.0)] == SlotState::Acquired
    }

    fn buffer_id(&self, slot: SlotIndex) -> BufferId {
        BufferId(self.generation * 16 + u64::from(slot.0))
    }
}

impl BufferQueue for TestQueue {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn check_ready(&self) -> Result<(), QueueError> {
        self.ready
    }

    fn acquire(&mut self) -> Result<AcquiredBuffer, QueueError> {
        if let Some(e) = self.fail_acquire {
            return Err(e);
        }
        let (slot, acquire_fence) = self
            .queued
            .pop_front()
            .ok_or(QueueError::NoBufferAvailable)?;
        self.slots[usize::from(slot.0)] = SlotState::Acquired;
        Ok(AcquiredBuffer {
            slot,
            buffer: self.buffer_id(slot),
            acquire_fence,
        })
    }

    fn release(&mut self, slot: SlotIndex, release_fence: FenceHandle) -> Result<(), QueueError> {
        let state = self
            .slots
            .get_mut(usize::from(slot.0))
            .ok_or(QueueError::InvalidSlot(slot))?;
        if *state != SlotState::Acquired {
            return Err(QueueError::InvalidSlot(slot));
        }
        *state = SlotState::Free;
        self.released.push((slot, release_fence.is_valid()));
        Ok(())
    }

    fn set_default_size(&mut self, size: SurfaceSize) {
        if self.default_size.is_some() {
            self.generation += 1;
        }
        self.default_size = Some(size);
    }
}

/// A composer that records every call.
#[derive(Debug, Default)]
pub(crate) struct TestComposer {
    pub(crate) client_targets: Vec<ClientTarget>,
    pub(crate) output_buffers: Vec<ClientTarget>,
    pub(crate) reject: Option<ComposerError>,
    pub(crate) next_present: FenceHandle,
    pub(crate) present_calls: usize,
}

impl Composer for TestComposer {
    fn set_client_target(
        &mut self,
        _output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError> {
        if let Some(e) = self.reject {
            return Err(e);
        }
        self.client_targets.push(target.clone());
        Ok(())
    }

    fn set_output_buffer(
        &mut self,
        _output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError> {
        if let Some(e) = self.reject {
            return Err(e);
        }
        self.output_buffers.push(target.clone());
        Ok(())
    }

    fn present_fence(&mut self, _output: OutputId) -> FenceHandle {
        self.present_calls += 1;
        self.next_present.clone()
    }
}

/// A fence the test can signal, plus a handle to it.
pub(crate) fn manual_fence() -> (Arc<ManualFence>, FenceHandle) {
    let fence = Arc::new(ManualFence::default());
    let handle = FenceHandle::new(fence.clone());
    (fence, handle)
}
