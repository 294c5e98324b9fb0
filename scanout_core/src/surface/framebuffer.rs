// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Physical-display surface.

use alloc::boxed::Box;
use core::fmt;

use kurbo::Rect;

use super::common::SurfaceCore;
use super::{BeginOutcome, DisplaySurface};
use crate::buffer::{BufferQueue, SlotIndex, SurfaceSize};
use crate::composer::Composer;
use crate::composition::CompositionType;
use crate::config::SurfaceConfig;
use crate::cycle::{FrameOp, FrameState};
use crate::damage::Damage;
use crate::error::FrameError;
use crate::extension::SurfaceExtension;
use crate::fence::FenceHandle;
use crate::output::OutputId;
use crate::trace::TraceSink;

/// Surface for a physical display.
///
/// Every frame is scanned out, so `begin_frame` never skips and the
/// configured [`RecomposePolicy`](crate::config::RecomposePolicy) is ignored.
///
/// Frames using the GPU path acquire the newest buffer from the queue at
/// `advance_frame` and hand it to the composer as the client target. When the
/// GPU queued nothing new, the buffer already on screen is handed over again.
/// Composer-only frames hand over nothing.
///
/// At `on_frame_committed` the composer's present fence becomes the release
/// fence of the buffer this frame superseded.
pub struct FramebufferSurface<Q, C> {
    core: SurfaceCore<Q, C>,
}

impl<Q, C> fmt::Debug for FramebufferSurface<Q, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramebufferSurface")
            .field("core", &self.core)
            .finish()
    }
}

impl<Q: BufferQueue, C: Composer> FramebufferSurface<Q, C> {
    /// Creates a surface and sets the queue's default buffer size to
    /// `config.size`.
    #[must_use]
    pub fn new(config: SurfaceConfig, queue: Q, composer: C) -> Self {
        Self {
            core: SurfaceCore::new(config, queue, composer),
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

    /// Slot currently on screen (or about to be).
    pub fn current_slot(&self) -> Option<SlotIndex> {
        self.core.slots.current().map(|active| active.slot)
    }

    /// Superseded slot waiting for this frame's release fence.
    pub fn pending_release(&self) -> Option<SlotIndex> {
        self.core.slots.pending_release()
    }

    /// Present fence collected at the last commit.
    pub fn last_present_fence(&self) -> &FenceHandle {
        &self.core.present_fence
    }

    /// Damage accumulated since the last produced frame.
    pub fn damage(&self) -> Damage {
        self.core.damage
    }
}

impl<Q: BufferQueue, C: Composer> DisplaySurface for FramebufferSurface<Q, C> {
    fn begin_frame(&mut self, must_recompose: bool) -> Result<BeginOutcome, FrameError> {
        self.core.begin(must_recompose, false)
    }

    fn prepare_frame(&mut self, composition: CompositionType) -> Result<(), FrameError> {
        self.core.prepare(composition)
    }

    fn advance_frame(&mut self, hdr_sdr_ratio: f32) -> Result<(), FrameError> {
        let core = &mut self.core;
        core.cycle.guard(FrameOp::Advance);

        if core.composition.uses_gpu() {
            let (target, checkpoint) = core.acquire_target(hdr_sdr_ratio)?;
            let output = core.output();
            if let Err(e) = core.composer.set_client_target(output, &target) {
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

        let fence = core.composer.present_fence(core.output());
        core.release_superseded(&fence);
        core.present_fence = fence;
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

    fn supports_composition_strategy_prediction(&self) -> bool {
        self.core.config.predict_composition
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
        self.core.dump(out, "FramebufferSurface")
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::any::Any;
    use core::cell::RefCell;

    use super::*;
    use crate::buffer::{BufferId, QueueError};
    use crate::composer::ComposerError;
    use crate::surface::testing::{TestComposer, TestQueue, manual_fence};
    use crate::trace::{FrameDroppedEvent, ReleaseEvent};

    type Surface = FramebufferSurface<TestQueue, TestComposer>;

    fn surface() -> Surface {
        let config = SurfaceConfig::physical(OutputId(0), SurfaceSize::new(1920, 1080));
        FramebufferSurface::new(config, TestQueue::with_slots(3), TestComposer::default())
    }

    /// Runs one full frame of the given type.
    fn frame(s: &mut Surface, composition: CompositionType) -> Result<(), FrameError> {
        s.begin_frame(false)?;
        s.prepare_frame(composition)?;
        s.advance_frame(1.0)?;
        s.on_frame_committed();
        Ok(())
    }

    #[test]
    fn construction_sets_default_size() {
        let s = surface();
        assert_eq!(s.queue().default_size, Some(SurfaceSize::new(1920, 1080)));
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.frame_index(), 0);
        assert!(!s.client_target_acquire_fence().is_valid());
    }

    #[test]
    fn gpu_frame_hands_off_client_target() {
        let mut s = surface();
        let (fence, handle) = manual_fence();
        s.queue_mut().queue_frame_with_fence(handle);

        assert_eq!(s.begin_frame(false), Ok(BeginOutcome::Compose));
        s.prepare_frame(CompositionType::GPU).unwrap();
        s.advance_frame(2.5).unwrap();

        let target = &s.composer().client_targets[0];
        assert_eq!(target.slot, SlotIndex(0));
        assert_eq!(target.hdr_sdr_ratio, 2.5);
        assert!(!target.acquire_fence.is_signaled());
        assert!(s.client_target_acquire_fence().ptr_eq(&target.acquire_fence));

        fence.signal(10);
        assert!(s.client_target_acquire_fence().is_signaled());
        s.on_frame_committed();
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.frame_index(), 1);
    }

    #[test]
    fn hwc_frame_acquires_nothing() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::HWC).unwrap();

        assert!(s.composer().client_targets.is_empty());
        assert_eq!(s.current_slot(), None);
        assert_eq!(s.composer().present_calls, 1);
        assert!(s.queue().released().is_empty());
    }

    #[test]
    fn superseded_buffer_released_with_present_fence() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        assert!(s.queue().released().is_empty(), "nothing superseded yet");

        let (present, handle) = manual_fence();
        s.composer_mut().next_present = handle;
        s.queue_mut().queue_frame();
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::MIXED).unwrap();
        s.advance_frame(1.0).unwrap();
        assert_eq!(s.pending_release(), Some(SlotIndex(0)));
        assert!(s.queue().is_acquired(SlotIndex(0)), "still held until commit");

        s.on_frame_committed();
        assert_eq!(s.queue().released(), &[(SlotIndex(0), true)]);
        assert_eq!(s.pending_release(), None);
        assert_eq!(s.current_slot(), Some(SlotIndex(1)));
        assert!(!s.last_present_fence().is_signaled());
        present.signal(5);
        assert!(s.last_present_fence().is_signaled());
    }

    #[test]
    fn nothing_queued_reuses_current_buffer() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        frame(&mut s, CompositionType::GPU).unwrap();

        let slots: Vec<_> = s.composer().client_targets.iter().map(|t| t.slot).collect();
        assert_eq!(slots, [SlotIndex(0), SlotIndex(0)]);
        assert!(s.queue().released().is_empty());
        assert!(s.queue().is_acquired(SlotIndex(0)));
    }

    #[test]
    fn gpu_frame_without_any_buffer_drops() {
        let mut s = surface();
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::GPU).unwrap();
        assert_eq!(
            s.advance_frame(1.0),
            Err(FrameError::AcquireFailed(QueueError::NoBufferAvailable))
        );
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.composition(), CompositionType::UNKNOWN);
    }

    #[test]
    fn source_not_ready_drops_frame_at_begin() {
        let mut s = surface();
        s.queue_mut().ready = Err(QueueError::Abandoned);
        assert_eq!(
            s.begin_frame(true),
            Err(FrameError::SourceNotReady(QueueError::Abandoned))
        );
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.frame_index(), 0);

        s.queue_mut().ready = Ok(());
        assert_eq!(s.begin_frame(true), Ok(BeginOutcome::Compose));
        assert_eq!(s.frame_index(), 1);
    }

    #[test]
    fn unsupported_composition_drops_frame() {
        let config = SurfaceConfig::physical(OutputId(0), SurfaceSize::new(64, 64))
            .with_supported(CompositionType::GPU);
        let mut s =
            FramebufferSurface::new(config, TestQueue::with_slots(2), TestComposer::default());

        s.begin_frame(false).unwrap();
        assert_eq!(
            s.prepare_frame(CompositionType::MIXED),
            Err(FrameError::UnsupportedComposition {
                requested: CompositionType::MIXED,
                supported: CompositionType::GPU,
            })
        );
        assert_eq!(s.state(), FrameState::Idle);

        s.begin_frame(false).unwrap();
        assert!(matches!(
            s.prepare_frame(CompositionType::UNKNOWN),
            Err(FrameError::UnsupportedComposition { .. })
        ));
    }

    #[test]
    fn composer_rejection_rolls_back_acquisition() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();

        s.queue_mut().queue_frame();
        s.composer_mut().reject = Some(ComposerError::Rejected);
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::GPU).unwrap();
        assert_eq!(
            s.advance_frame(1.0),
            Err(FrameError::ComposerRejected(ComposerError::Rejected))
        );

        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.current_slot(), Some(SlotIndex(0)));
        assert_eq!(s.pending_release(), None);
        // The unused buffer went straight back without a fence.
        assert_eq!(s.queue().released(), &[(SlotIndex(1), false)]);
        assert!(s.queue().is_acquired(SlotIndex(0)));
    }

    #[test]
    fn acquire_error_other_than_empty_drops_frame() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();

        s.queue_mut().fail_acquire = Some(QueueError::Timeout);
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::GPU).unwrap();
        assert_eq!(
            s.advance_frame(1.0),
            Err(FrameError::AcquireFailed(QueueError::Timeout))
        );
        assert_eq!(s.current_slot(), Some(SlotIndex(0)));
    }

    #[test]
    #[should_panic(expected = "advance_frame called while advanced")]
    fn advance_twice_panics() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::GPU).unwrap();
        s.advance_frame(1.0).unwrap();
        _ = s.advance_frame(1.0);
    }

    #[test]
    #[should_panic(expected = "on_frame_committed called while idle")]
    fn commit_without_frame_panics() {
        let mut s = surface();
        s.on_frame_committed();
    }

    #[test]
    #[should_panic(expected = "resize_buffers called while prepared")]
    fn resize_mid_frame_panics() {
        let mut s = surface();
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::HWC).unwrap();
        s.resize_buffers(SurfaceSize::new(10, 10));
    }

    #[test]
    #[should_panic(expected = "resize_buffers called while begun")]
    fn resize_after_begin_panics() {
        let mut s = surface();
        s.begin_frame(false).unwrap();
        s.resize_buffers(SurfaceSize::new(10, 10));
    }

    #[test]
    #[should_panic(expected = "prepare_frame called while advanced")]
    fn prepare_after_advance_panics() {
        let mut s = surface();
        s.begin_frame(false).unwrap();
        s.prepare_frame(CompositionType::HWC).unwrap();
        s.advance_frame(1.0).unwrap();
        _ = s.prepare_frame(CompositionType::GPU);
    }

    #[test]
    fn violation_leaves_state_unchanged() {
        let mut s = surface();
        s.begin_frame(false).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            _ = s.advance_frame(1.0);
        }));
        assert!(result.is_err());
        assert_eq!(s.state(), FrameState::Begun);
        assert_eq!(s.frame_index(), 1);

        // The frame can still be finished normally.
        s.prepare_frame(CompositionType::HWC).unwrap();
        s.advance_frame(1.0).unwrap();
        s.on_frame_committed();
        assert_eq!(s.state(), FrameState::Idle);
    }

    #[test]
    #[should_panic(expected = "advance_frame called while idle")]
    fn advance_from_idle_panics() {
        let mut s = surface();
        _ = s.advance_frame(1.0);
    }

    #[test]
    fn advance_from_idle_leaves_surface_idle() {
        let mut s = surface();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            _ = s.advance_frame(1.0);
        }));
        assert!(result.is_err());
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.frame_index(), 0);
        assert!(s.composer().client_targets.is_empty());

        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        assert_eq!(s.frame_index(), 1);
    }

    #[test]
    fn acquire_fence_is_readable_in_every_state() {
        let mut s = surface();
        let (gpu, handle) = manual_fence();
        assert!(s.client_target_acquire_fence().ptr_eq(&FenceHandle::NO_FENCE));

        s.queue_mut().queue_frame_with_fence(handle.clone());
        s.begin_frame(false).unwrap();
        assert_eq!(s.state(), FrameState::Begun);
        assert!(s.client_target_acquire_fence().ptr_eq(&FenceHandle::NO_FENCE));

        s.prepare_frame(CompositionType::GPU).unwrap();
        assert_eq!(s.state(), FrameState::Prepared);
        assert!(!s.client_target_acquire_fence().is_valid(), "not acquired yet");

        s.advance_frame(1.0).unwrap();
        assert_eq!(s.state(), FrameState::Advanced);
        assert!(s.client_target_acquire_fence().ptr_eq(&handle));
        assert!(!s.client_target_acquire_fence().is_signaled());

        s.on_frame_committed();
        assert_eq!(s.state(), FrameState::Idle);
        assert!(s.client_target_acquire_fence().ptr_eq(&handle));
        gpu.signal(7);
        assert!(s.client_target_acquire_fence().is_signaled());

        // A composer-only frame keeps reporting the last GPU buffer's fence.
        s.begin_frame(false).unwrap();
        assert!(s.client_target_acquire_fence().ptr_eq(&handle));
        s.prepare_frame(CompositionType::HWC).unwrap();
        s.advance_frame(1.0).unwrap();
        assert!(s.client_target_acquire_fence().ptr_eq(&handle));
        s.on_frame_committed();
    }

    #[test]
    fn resize_resets_fence_and_forces_damage() {
        let mut s = surface();
        let (_fence, handle) = manual_fence();
        s.queue_mut().queue_frame_with_fence(handle);
        frame(&mut s, CompositionType::GPU).unwrap();
        assert!(s.client_target_acquire_fence().is_valid());
        assert!(s.damage().is_empty());

        s.resize_buffers(SurfaceSize::new(1280, 720));
        assert_eq!(s.size(), SurfaceSize::new(1280, 720));
        assert_eq!(s.queue().default_size, Some(SurfaceSize::new(1280, 720)));
        assert!(!s.client_target_acquire_fence().is_valid());
        assert_eq!(
            s.damage().bounds(),
            Some(Rect::new(0.0, 0.0, 1280.0, 720.0))
        );
    }

    #[test]
    fn resize_never_reuses_pre_resize_buffer() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();

        s.resize_buffers(SurfaceSize::new(1280, 720));
        assert!(s.dump_as_string().contains("current_slot=#0 buffer=0 (stale)"));
        assert_eq!(
            frame(&mut s, CompositionType::GPU),
            Err(FrameError::AcquireFailed(QueueError::NoBufferAvailable))
        );
        assert_eq!(s.state(), FrameState::Idle);
        assert_eq!(s.composer().client_targets.len(), 1);
        assert!(s.queue().is_acquired(SlotIndex(0)), "still on screen");

        // Composer-only frames hand over no buffer and are unaffected.
        frame(&mut s, CompositionType::HWC).unwrap();

        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        let target = &s.composer().client_targets[1];
        assert_eq!(target.slot, SlotIndex(1));
        assert_eq!(target.buffer, BufferId(17), "allocated at the new size");
        assert_eq!(s.queue().released(), &[(SlotIndex(0), false)]);

        // The fresh buffer may be reused as usual.
        frame(&mut s, CompositionType::GPU).unwrap();
        assert_eq!(s.composer().client_targets[2].slot, SlotIndex(1));
    }

    #[test]
    fn damage_is_clipped_and_cleared_by_commit() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();

        s.add_damage(Rect::new(1900.0, 1000.0, 2000.0, 2000.0));
        assert_eq!(
            s.damage().bounds(),
            Some(Rect::new(1900.0, 1000.0, 1920.0, 1080.0))
        );
        s.begin_frame(false).unwrap();
        s.add_damage(Rect::new(0.0, 0.0, 10.0, 10.0));
        s.prepare_frame(CompositionType::HWC).unwrap();
        s.advance_frame(1.0).unwrap();
        s.on_frame_committed();
        assert!(s.damage().is_empty());
    }

    #[test]
    fn physical_surface_never_skips() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        assert_eq!(s.begin_frame(false), Ok(BeginOutcome::Compose));
    }

    #[test]
    fn prediction_follows_config() {
        let s = surface();
        assert!(!s.supports_composition_strategy_prediction());

        let config =
            SurfaceConfig::physical(OutputId(1), SurfaceSize::new(8, 8)).with_prediction(true);
        let s = FramebufferSurface::new(config, TestQueue::with_slots(2), TestComposer::default());
        assert!(s.supports_composition_strategy_prediction());
    }

    #[test]
    fn trace_sink_sees_drop_and_release() {
        #[derive(Default)]
        struct Sink {
            dropped: Vec<FrameDroppedEvent>,
            released: Vec<ReleaseEvent>,
        }
        impl TraceSink for Sink {
            fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
                self.dropped.push(*e);
            }
            fn on_release(&mut self, e: &ReleaseEvent) {
                self.released.push(*e);
            }
        }

        let sink = Rc::new(RefCell::new(Sink::default()));
        let mut s = surface().with_trace_sink(Box::new(sink.clone()));
        s.queue_mut().ready = Err(QueueError::Timeout);
        _ = s.begin_frame(false);
        s.queue_mut().ready = Ok(());
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();

        let sink = sink.borrow();
        if cfg!(feature = "trace") {
            assert_eq!(sink.dropped.len(), 1);
            assert_eq!(sink.dropped[0].frame_index, 1);
            assert_eq!(sink.dropped[0].op, FrameOp::Begin);
            assert_eq!(sink.released.len(), 1);
            assert_eq!(sink.released[0].slot, SlotIndex(0));
            assert!(sink.released[0].accepted);
        } else {
            assert!(sink.dropped.is_empty());
            assert!(sink.released.is_empty());
        }
    }

    #[test]
    fn extension_is_reachable_and_dumped() {
        #[derive(Debug, Default)]
        struct PanelTweaks {
            toggles: u32,
        }
        impl SurfaceExtension for PanelTweaks {
            fn name(&self) -> &str {
                "panel-tweaks"
            }
            fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
                writeln!(out, "    toggles={}", self.toggles)
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut plain = surface();
        assert!(plain.extension().is_none());

        let mut s = surface().with_extension(Box::new(PanelTweaks::default()));
        let ext = s.extension().unwrap();
        assert_eq!(ext.name(), "panel-tweaks");
        ext.as_any_mut()
            .downcast_mut::<PanelTweaks>()
            .unwrap()
            .toggles = 3;

        let dump: String = s.dump_as_string();
        assert!(dump.contains("extension=panel-tweaks"), "{dump}");
        assert!(dump.contains("toggles=3"), "{dump}");
    }

    #[test]
    fn dump_describes_state() {
        let mut s = surface();
        s.queue_mut().queue_frame();
        frame(&mut s, CompositionType::GPU).unwrap();
        s.begin_frame(false).unwrap();

        let dump = s.dump_as_string();
        assert!(dump.starts_with("FramebufferSurface display-0:"), "{dump}");
        assert!(dump.contains("state=begun frame=2 size=1920x1080"), "{dump}");
        assert!(dump.contains("slots=3 current_slot=#0 buffer=0 pending"), "{dump}");
        assert!(dump.contains("pending_release=none"), "{dump}");
    }
}
