// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated hardware composer.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use scanout_core::buffer::SlotIndex;
use scanout_core::composer::{ClientTarget, Composer, ComposerError};
use scanout_core::fence::FenceHandle;
use scanout_core::output::OutputId;

use crate::timeline::FenceTimeline;

/// Parameters for a [`SimComposer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimComposerConfig {
    /// Ticks between a commit and its present fence signaling.
    pub present_ticks: u64,
    /// Whether virtual-display output buffers are accepted.
    pub output_buffers: bool,
}

impl SimComposerConfig {
    /// Presents instantly and accepts output buffers.
    pub const INSTANT: Self = Self {
        present_ticks: 0,
        output_buffers: true,
    };

    /// Sets the present latency.
    #[must_use]
    pub const fn with_present_ticks(mut self, ticks: u64) -> Self {
        self.present_ticks = ticks;
        self
    }

    /// Enables or disables output-buffer support.
    #[must_use]
    pub const fn with_output_buffers(mut self, enabled: bool) -> Self {
        self.output_buffers = enabled;
        self
    }
}

impl Default for SimComposerConfig {
    fn default() -> Self {
        Self::INSTANT
    }
}

/// What the composer was handed for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Submission {
    /// Display the buffer was set for.
    pub output: OutputId,
    /// Slot handed over.
    pub slot: SlotIndex,
    /// Whether it was an output buffer rather than a client target.
    pub output_buffer: bool,
    /// Whether the acquire fence had signaled when it was handed over.
    pub acquire_signaled: bool,
    /// HDR/SDR ratio passed along.
    pub hdr_sdr_ratio: f32,
}

#[derive(Debug)]
struct ComposerState {
    config: SimComposerConfig,
    submissions: Vec<Submission>,
    reject_next: Option<ComposerError>,
    presents: u64,
}

/// A deterministic in-memory [`Composer`].
///
/// Cloneable handle, like [`SimBufferQueue`](crate::queue::SimBufferQueue).
#[derive(Clone, Debug)]
pub struct SimComposer {
    state: Rc<RefCell<ComposerState>>,
    timeline: FenceTimeline,
}

impl SimComposer {
    /// Creates a composer whose present fences live on `timeline`.
    #[must_use]
    pub fn new(config: SimComposerConfig, timeline: FenceTimeline) -> Self {
        Self {
            state: Rc::new(RefCell::new(ComposerState {
                config,
                submissions: Vec::new(),
                reject_next: None,
                presents: 0,
            })),
            timeline,
        }
    }

    /// Fails the next submission with `error`.
    pub fn reject_next(&self, error: ComposerError) {
        self.state.borrow_mut().reject_next = Some(error);
    }

    /// Every accepted submission so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.borrow().submissions.clone()
    }

    /// Number of present fences handed out.
    #[must_use]
    pub fn presents(&self) -> u64 {
        self.state.borrow().presents
    }

    fn submit(
        &self,
        output: OutputId,
        target: &ClientTarget,
        output_buffer: bool,
    ) -> Result<(), ComposerError> {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.reject_next.take() {
            return Err(e);
        }
        state.submissions.push(Submission {
            output,
            slot: target.slot,
            output_buffer,
            acquire_signaled: target.acquire_fence.is_signaled(),
            hdr_sdr_ratio: target.hdr_sdr_ratio,
        });
        Ok(())
    }
}

impl Composer for SimComposer {
    fn set_client_target(
        &mut self,
        output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError> {
        self.submit(output, target, false)
    }

    fn set_output_buffer(
        &mut self,
        output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError> {
        if !self.state.borrow().config.output_buffers {
            return Err(ComposerError::Unsupported);
        }
        self.submit(output, target, true)
    }

    fn present_fence(&mut self, _output: OutputId) -> FenceHandle {
        let mut state = self.state.borrow_mut();
        state.presents += 1;
        self.timeline.fence_after(state.config.present_ticks)
    }
}
