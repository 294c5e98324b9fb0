// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State and transitions shared by every surface variant.
//!
//! Variants differ only in what `advance_frame` hands to the composer and
//! what `on_frame_committed` does with the present fence. Guarding, frame
//! bookkeeping, damage, resize, and tracing all live here.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Rect;

use super::BeginOutcome;
use super::slots::{Checkpoint, SlotTracker};
use crate::buffer::{BufferQueue, SurfaceSize};
use crate::composer::{ClientTarget, Composer};
use crate::composition::CompositionType;
use crate::config::SurfaceConfig;
use crate::cycle::{FrameCycle, FrameOp};
use crate::damage::Damage;
use crate::error::FrameError;
use crate::extension::SurfaceExtension;
use crate::fence::FenceHandle;
use crate::output::OutputId;
use crate::trace::{
    BufferHandoffEvent, FrameDroppedEvent, ReleaseEvent, ResizeEvent, SkipEvent, TraceSink,
    Tracer, TransitionEvent,
};

pub(crate) struct SurfaceCore<Q, C> {
    pub(crate) config: SurfaceConfig,
    pub(crate) cycle: FrameCycle,
    pub(crate) queue: Q,
    pub(crate) composer: C,
    pub(crate) size: SurfaceSize,
    /// Type of the frame in progress, or of the last committed frame.
    pub(crate) composition: CompositionType,
    /// Whether the frame in progress skips buffer production.
    pub(crate) skip: bool,
    pub(crate) slots: SlotTracker,
    pub(crate) damage: Damage,
    /// Whether the last produced output still reflects the surface contents.
    pub(crate) content_valid: bool,
    pub(crate) present_fence: FenceHandle,
    sink: Option<Box<dyn TraceSink>>,
    extension: Option<Box<dyn SurfaceExtension>>,
}

impl<Q, C> fmt::Debug for SurfaceCore<Q, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceCore")
            .field("config", &self.config)
            .field("cycle", &self.cycle)
            .field("size", &self.size)
            .field("composition", &self.composition)
            .field("skip", &self.skip)
            .field("slots", &self.slots)
            .field("damage", &self.damage)
            .field("content_valid", &self.content_valid)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl<Q: BufferQueue, C: Composer> SurfaceCore<Q, C> {
    pub(crate) fn new(config: SurfaceConfig, mut queue: Q, composer: C) -> Self {
        queue.set_default_size(config.size);
        Self {
            config,
            cycle: FrameCycle::new(),
            queue,
            composer,
            size: config.size,
            composition: CompositionType::UNKNOWN,
            skip: false,
            slots: SlotTracker::default(),
            damage: Damage::full(config.size.bounds()),
            content_valid: false,
            present_fence: FenceHandle::NO_FENCE,
            sink: None,
            extension: None,
        }
    }

    // -- wiring ------------------------------------------------------------

    #[inline]
    pub(crate) fn output(&self) -> OutputId {
        self.config.output
    }

    pub(crate) fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    pub(crate) fn set_extension(&mut self, extension: Box<dyn SurfaceExtension>) {
        self.extension = Some(extension);
    }

    pub(crate) fn extension_mut(&mut self) -> Option<&mut dyn SurfaceExtension> {
        match &mut self.extension {
            Some(ext) => Some(ext.as_mut()),
            None => None,
        }
    }

    fn tracer(&mut self) -> Tracer<'_> {
        match &mut self.sink {
            Some(sink) => Tracer::new(sink.as_mut()),
            None => Tracer::none(),
        }
    }

    // -- transitions -------------------------------------------------------

    /// Completes `op` and reports the transition.
    pub(crate) fn transition(&mut self, op: FrameOp) {
        let from = self.cycle.complete(op);
        let e = TransitionEvent {
            output: self.output(),
            frame_index: self.cycle.frame_index(),
            op,
            from,
            to: self.cycle.state(),
        };
        self.tracer().transition(&e);
    }

    /// Drops the frame in progress and returns `error` for the caller.
    pub(crate) fn drop_frame(&mut self, op: FrameOp, error: FrameError) -> FrameError {
        self.cycle.abandon();
        self.skip = false;
        self.composition = CompositionType::UNKNOWN;
        // A frame that failed to begin never received an index of its own.
        let frame_index = self.cycle.frame_index() + u64::from(op == FrameOp::Begin);
        let e = FrameDroppedEvent {
            output: self.output(),
            frame_index,
            op,
            error,
        };
        self.tracer().frame_dropped(&e);
        error
    }

    pub(crate) fn begin(
        &mut self,
        must_recompose: bool,
        allow_skip: bool,
    ) -> Result<BeginOutcome, FrameError> {
        self.cycle.guard(FrameOp::Begin);

        let recompose = must_recompose || !self.content_valid;
        let skip = allow_skip && !recompose && self.damage.is_empty();
        if !skip && let Err(e) = self.queue.check_ready() {
            return Err(self.drop_frame(FrameOp::Begin, FrameError::SourceNotReady(e)));
        }

        self.skip = skip;
        self.composition = CompositionType::UNKNOWN;
        self.transition(FrameOp::Begin);
        if skip {
            let e = SkipEvent {
                output: self.output(),
                frame_index: self.cycle.frame_index(),
            };
            self.tracer().skip(&e);
            Ok(BeginOutcome::Skip)
        } else {
            Ok(BeginOutcome::Compose)
        }
    }

    pub(crate) fn prepare(&mut self, composition: CompositionType) -> Result<(), FrameError> {
        self.cycle.guard(FrameOp::Prepare);

        let supported = self.config.supported;
        if !composition.is_serviceable_by(supported) {
            return Err(self.drop_frame(
                FrameOp::Prepare,
                FrameError::UnsupportedComposition {
                    requested: composition,
                    supported,
                },
            ));
        }

        self.composition = composition;
        self.transition(FrameOp::Prepare);
        Ok(())
    }

    // -- buffer handoff ----------------------------------------------------

    /// Acquires the buffer to hand off this frame.
    ///
    /// On failure the frame has already been dropped.
    pub(crate) fn acquire_target(
        &mut self,
        hdr_sdr_ratio: f32,
    ) -> Result<(ClientTarget, Checkpoint), FrameError> {
        match self.slots.acquire_next(&mut self.queue) {
            Ok((active, checkpoint)) => Ok((
                ClientTarget {
                    slot: active.slot,
                    buffer: active.buffer,
                    acquire_fence: self.slots.acquire_fence().clone(),
                    hdr_sdr_ratio,
                },
                checkpoint,
            )),
            Err(e) => Err(self.drop_frame(FrameOp::Advance, FrameError::AcquireFailed(e))),
        }
    }

    /// Undoes the acquisition behind a rejected handoff and drops the frame.
    pub(crate) fn fail_handoff(&mut self, checkpoint: Checkpoint, error: FrameError) -> FrameError {
        self.slots.rollback(&mut self.queue, checkpoint);
        self.drop_frame(FrameOp::Advance, error)
    }

    pub(crate) fn report_handoff(&mut self, target: &ClientTarget) {
        let e = BufferHandoffEvent {
            output: self.output(),
            frame_index: self.cycle.frame_index(),
            slot: target.slot,
            composition: self.composition,
            acquire_signaled: target.acquire_fence.is_signaled(),
            hdr_sdr_ratio: target.hdr_sdr_ratio,
        };
        self.tracer().buffer_handoff(&e);
    }

    // -- commit ------------------------------------------------------------

    /// Returns the slot this frame superseded to the queue, guarded by
    /// `fence`.
    pub(crate) fn release_superseded(&mut self, fence: &FenceHandle) {
        let Some(slot) = self.slots.take_pending_release() else {
            return;
        };
        let accepted = self.queue.release(slot, fence.clone()).is_ok();
        let e = ReleaseEvent {
            output: self.output(),
            frame_index: self.cycle.frame_index(),
            slot,
            fence_valid: fence.is_valid(),
            fence_signaled: fence.is_signaled(),
            accepted,
        };
        self.tracer().release(&e);
    }

    /// Completes the commit. A produced frame consumes the accumulated
    /// damage and makes the surface contents valid again.
    pub(crate) fn end_frame(&mut self) {
        if !self.skip {
            self.damage.clear();
            self.content_valid = true;
        }
        self.skip = false;
        self.transition(FrameOp::Commit);
    }

    // -- between frames ----------------------------------------------------

    pub(crate) fn resize(&mut self, size: SurfaceSize) {
        self.cycle.guard(FrameOp::Resize);

        let old = self.size;
        self.queue.set_default_size(size);
        self.size = size;
        self.slots.invalidate();
        self.content_valid = false;
        self.damage = Damage::full(size.bounds());

        let e = ResizeEvent {
            output: self.output(),
            old,
            new: size,
        };
        self.tracer().resize(&e);
    }

    pub(crate) fn add_damage(&mut self, rect: Rect) {
        self.cycle.guard(FrameOp::Damage);
        self.damage.add(rect, self.size.bounds());
    }

    // -- diagnostics -------------------------------------------------------

    pub(crate) fn dump(&self, out: &mut dyn fmt::Write, name: &str) -> fmt::Result {
        writeln!(out, "{name} {}:", self.output())?;
        writeln!(
            out,
            "  state={} frame={} size={} composition={}{}",
            self.cycle.state(),
            self.cycle.frame_index(),
            self.size,
            self.composition,
            if self.skip { " (skipping)" } else { "" },
        )?;
        write!(out, "  slots={}", self.queue.slot_count())?;
        match self.slots.current() {
            Some(active) => write!(
                out,
                " current_slot={} buffer={}{}",
                active.slot,
                active.buffer.0,
                if self.slots.is_stale() { " (stale)" } else { "" },
            )?,
            None => write!(out, " current_slot=none")?,
        }
        match self.slots.pending_release() {
            Some(slot) => writeln!(out, " pending_release={slot}")?,
            None => writeln!(out, " pending_release=none")?,
        }
        writeln!(
            out,
            "  acquire_fence={} present_fence={}",
            fence_state(self.slots.acquire_fence()),
            fence_state(&self.present_fence),
        )?;
        match self.damage.bounds() {
            Some(r) => write!(
                out,
                "  damage=[{:.0},{:.0} {:.0}x{:.0}]",
                r.x0,
                r.y0,
                r.width(),
                r.height()
            )?,
            None => write!(out, "  damage=none")?,
        }
        writeln!(
            out,
            " content_valid={} supported={:?} recompose={:?}",
            self.content_valid, self.config.supported, self.config.recompose,
        )?;
        if let Some(ext) = &self.extension {
            writeln!(out, "  extension={}", ext.name())?;
            ext.dump(out)?;
        }
        Ok(())
    }
}

fn fence_state(fence: &FenceHandle) -> &'static str {
    match (fence.is_valid(), fence.is_signaled()) {
        (false, _) => "none",
        (true, true) => "signaled",
        (true, false) => "pending",
    }
}
