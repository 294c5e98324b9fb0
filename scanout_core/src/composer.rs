// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware-composer contract.
//!
//! The composer is the fixed-function unit that scans layers out to a
//! display. A surface talks to it at two points per frame:
//!
//! - at `advance_frame`, to hand over the client target (the buffer the GPU
//!   rendered into) or, on virtual displays, the output buffer the composer
//!   writes into;
//! - at `on_frame_committed`, to collect the present fence for the frame that
//!   was just committed. That fence becomes the release fence of the buffer
//!   the frame superseded.

use core::fmt;

use crate::buffer::{BufferId, SlotIndex};
use crate::fence::FenceHandle;
use crate::output::OutputId;

/// A buffer handed to the composer for one frame.
#[derive(Clone, Debug)]
pub struct ClientTarget {
    /// Slot the buffer occupies.
    pub slot: SlotIndex,
    /// Identity of the buffer.
    pub buffer: BufferId,
    /// The composer must wait on this before reading the buffer.
    pub acquire_fence: FenceHandle,
    /// HDR-to-SDR luminance ratio for the frame, passed through unchanged.
    pub hdr_sdr_ratio: f32,
}

/// Errors reported by a [`Composer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposerError {
    /// The composer refused the buffer for this frame.
    Rejected,
    /// The operation is not available for this display.
    Unsupported,
    /// The composer device went away.
    Disconnected,
}

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("composer rejected the buffer"),
            Self::Unsupported => f.write_str("operation not supported by the composer"),
            Self::Disconnected => f.write_str("composer disconnected"),
        }
    }
}

impl core::error::Error for ComposerError {}

/// The hardware-composition device, as seen by a display surface.
pub trait Composer {
    /// Sets the GPU-composed buffer for `output`'s next frame.
    fn set_client_target(
        &mut self,
        output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError>;

    /// Sets the buffer the composer writes into for a virtual display.
    fn set_output_buffer(
        &mut self,
        output: OutputId,
        target: &ClientTarget,
    ) -> Result<(), ComposerError> {
        _ = (output, target);
        Err(ComposerError::Unsupported)
    }

    /// Returns the present fence of the last frame committed on `output`.
    ///
    /// The fence signals once that frame is on screen, which is when the
    /// buffer it replaced stops being read. Returns
    /// [`FenceHandle::NO_FENCE`] if the composer has nothing outstanding.
    fn present_fence(&mut self, output: OutputId) -> FenceHandle;
}
