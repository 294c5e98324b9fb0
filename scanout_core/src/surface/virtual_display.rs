// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual-display surface.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Rect;

use super::common::SurfaceCore;
use super::{BeginOutcome, DisplaySurface};
use crate::buffer::{BufferQueue, SlotIndex, SurfaceSize};
use crate::composer::{ClientTarget, Composer, ComposerError};
use crate::composition::CompositionType;
use crate::config::{RecomposePolicy, SurfaceConfig};
use crate::cycle::{FrameOp, FrameState};
use crate::error::FrameError;
use crate::extension::SurfaceExtension;
use crate::fence::FenceHandle;
use crate::output::OutputId;
use crate::trace::TraceSink;

/// Surface for a virtual display (screen recording, casting, and the like).
///
/// The output is consumed by software rather than scanned out, so a frame
/// whose content did not change may skip buffer production entirely when the
/// configured [`RecomposePolicy`] allows it. Skipped frames still go through
/// every lifecycle call but touch neither the queue nor the composer.
///
/// Produced frames acquire an output buffer. The composer writes into it if
/// the frame uses the composer path, and the GPU result is set as the client
/// target if the frame uses the GPU path. After commit, [`output_fence`]
/// tells the consumer when the buffer is complete.
///
/// [`output_fence`]: Self::output_fence
pub struct VirtualSurface<Q, C> {
    core: SurfaceCore<Q, C>,
    output_fence: FenceHandle,
}

impl<Q, C> fmt::Debug for VirtualSurface<Q, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualSurface")
            .field("core", &self.core)
            .field("output_fence", &self.output_fence)
            .finish()
    }
}

impl<Q: BufferQueue, C: Composer> VirtualSurface<Q, C> {
    /// Creates a surface and sets the queue's default buffer size to
    /// `config.size`.
    #[must_use]
    pub fn new(config: SurfaceConfig, queue: Q, composer: C) -> Self {
        Self {
            core: SurfaceCore::new(config, queue, composer),
            output_fence: FenceHandle::NO_FENCE,
        }
    }

    /// Routes lifecycle events to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.core.set_sink(sink);
        self
    }

    /// Attaches a vendor extension.
    #[must_use]
    pub fn with_extension(mut self, extension: Box<dyn SurfaceExtension>) -> Self {
        self.core.set_extension(extension);
        self
    }

    /// The buffer queue.
    pub fn queue(&self) -> &Q {
        &self.core.queue
    }

    /// The buffer queue, mutably.
    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.core.queue
    }

    /// The composer.
    pub fn composer(&self) -> &C {
        &self.core.composer
    }

    /// The composer, mutably.
    pub fn composer_mut(&mut self) -> &mut C {
        &mut self.core.composer
    }

    /// Slot holding the latest output.
    pub fn current_slot(&self) -> Option<SlotIndex> {
        self.core.slots.current().map(|active| active.slot)
    }

    /// Fence the consumer waits on before reading the latest output.
    ///
    /// For a mixed frame this merges the composer's present fence with the
    /// GPU's acquire fence; otherwise it is whichever of the two produced the
    /// output. Unchanged by skipped frames.
    pub fn output_fence(&self) -> &FenceHandle {
        &self.output_fence
    }

    /// Whether the frame in progress skips buffer production.
    pub fn is_skipping(&self) -> bool {
        self.core.skip
    }
}

fn submit<C: Composer>(
    composer: &mut C,
    output: OutputId,
    composition: CompositionType,
    target: &ClientTarget,
) -> Result<(), ComposerError> {
    if composition.uses_hwc() {
        composer.set_output_buffer(output, target)?;
    }
    if composition.uses_gpu() {
        composer.set_client_target(output, target)?;
    }
    Ok(())
}

impl<Q: BufferQueue, C: Composer> DisplaySurface for VirtualSurface<Q, C> {
    fn begin_frame(&mut self, must_recompose: bool) -> Result<BeginOutcome, FrameError> {
        let allow_skip = self.core.config.recompose == RecomposePolicy::SkipWhenUnchanged;
        self.core.begin(must_recompose, allow_skip)
    }

    fn prepare_frame(&mut self, composition: CompositionType) -> Result<(), FrameError> {
        self.core.prepare(composition)
    }

    fn advance_frame(&mut self, hdr_sdr_ratio: f32) -> Result<(), FrameError> {
        let core = &mut self.core;
        core.cycle.guard(FrameOp::Advance);

        if !core.skip {
            let (target, checkpoint) = core.acquire_target(hdr_sdr_ratio)?;
            let output = core.output();
            if let Err(e) = submit(&mut core.composer, output, core.composition, &target) {
                return Err(core.fail_handoff(checkpoint, e.into()));
            }
            core.report_handoff(&target);
        }

        core.transition(FrameOp::Advance);
        Ok(())
    }

    fn on_frame_committed(&mut self) {
        let core = &mut self.core;
        core.cycle.guard(FrameOp::Commit);

        if !core.skip {
            let present = core.composer.present_fence(core.output());
            let acquire = core.slots.acquire_fence();
            self.output_fence = match (core.composition.uses_hwc(), core.composition.uses_gpu()) {
                (true, true) => FenceHandle::merge(&present, acquire),
                (true, false) => present.clone(),
                _ => acquire.clone(),
            };
            core.release_superseded(&present);
            core.present_fence = present;
        }
        core.end_frame();
    }

    fn client_target_acquire_fence(&self) -> &FenceHandle {
        self.core.slots.acquire_fence()
    }

    fn resize_buffers(&mut self, size: SurfaceSize) {
        self.core.resize(size);
    }

    fn add_damage(&mut self, rect: Rect) {
        self.core.add_damage(rect);
    }

    fn extension(&mut self) -> Option<&mut dyn SurfaceExtension> {
        self.core.extension_mut()
    }

    fn state(&self) -> FrameState {
        self.core.cycle.state()
    }

    fn frame_index(&self) -> u64 {
        self.core.cycle.frame_index()
    }

    fn output(&self) -> OutputId {
        self.core.output()
    }

    fn size(&self) -> SurfaceSize {
        self.core.size
    }

    fn composition(&self) -> CompositionType {
        self.core.composition
    }

    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.core.dump(out, "VirtualSurface")?;
        let fence = &self.output_fence;
        let state = match (fence.is_valid(), fence.is_signaled()) {
            (false, _) => "none",
            (true, true) => "signaled",
            (true, false) => "pending",
        };
        writeln!(out, "  output_fence={state}")
    }
}
