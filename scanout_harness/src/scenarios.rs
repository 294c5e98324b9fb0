// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end runs of both surface variants against the simulated queue and
//! composer.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;
use scanout_core::buffer::{QueueError, SurfaceSize};
use scanout_core::composer::ComposerError;
use scanout_core::composition::CompositionType;
use scanout_core::config::SurfaceConfig;
use scanout_core::cycle::{FrameOp, FrameState};
use scanout_core::error::FrameError;
use scanout_core::output::OutputId;
use scanout_core::surface::{DisplaySurface, FramebufferSurface, VirtualSurface};
use scanout_core::time::{HostTime, Timebase};
use scanout_debug::clock::SteppingClock;
use scanout_debug::recorder::{RecordedEvent, RecorderSink, decode};

use crate::composer::{SimComposer, SimComposerConfig};
use crate::driver::{FrameDriver, FrameReport, FrameRequest};
use crate::queue::{SimBufferQueue, SimQueueConfig};
use crate::stats::{FrameGrade, FrameStats};
use crate::timeline::FenceTimeline;

const VSYNC: u64 = 16;
const SIZE: SurfaceSize = SurfaceSize::new(1920, 1080);

struct Rig {
    timeline: FenceTimeline,
    queue: SimBufferQueue,
    composer: SimComposer,
}

impl Rig {
    fn new(queue: SimQueueConfig, composer: SimComposerConfig) -> Self {
        let timeline = FenceTimeline::new();
        Self {
            queue: SimBufferQueue::new(queue, timeline.clone()),
            composer: SimComposer::new(composer, timeline.clone()),
            timeline,
        }
    }

    fn physical(&self, config: SurfaceConfig) -> FramebufferSurface<SimBufferQueue, SimComposer> {
        FramebufferSurface::new(config, self.queue.clone(), self.composer.clone())
    }

    fn virtual_display(&self, config: SurfaceConfig) -> VirtualSurface<SimBufferQueue, SimComposer> {
        VirtualSurface::new(config, self.queue.clone(), self.composer.clone())
    }
}

fn gpu(_: Option<CompositionType>) -> CompositionType {
    CompositionType::GPU
}

fn no_render(_: CompositionType) {}

#[test]
fn steady_state_triple_buffering_never_stalls_the_producer() {
    let rig = Rig::new(
        SimQueueConfig::TRIPLE.with_render_ticks(4),
        SimComposerConfig::INSTANT.with_present_ticks(VSYNC),
    );
    let mut surface = rig.physical(SurfaceConfig::physical(OutputId(0), SIZE));
    let mut driver = FrameDriver::new();
    let mut stats = FrameStats::<16>::new();

    for _ in 0..60 {
        assert!(rig.queue.queue_frame().is_some(), "producer stalled");
        let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
        stats.observe(&report);
        rig.timeline.advance(VSYNC);
    }

    let queue = rig.queue.stats();
    assert_eq!(queue.producer_stalls, 0);
    assert_eq!(queue.acquired, 60);
    assert_eq!(queue.released, 59, "every superseded slot came back");
    assert_eq!(queue.released_unfenced, 0, "all releases carry a present fence");
    assert_eq!(rig.queue.held_by_consumer(), 1);
    assert_eq!(rig.composer.presents(), 60);

    let report = stats.report();
    assert_eq!(report.presented, 60);
    assert_eq!(report.grade, FrameGrade::A);
    assert_eq!(stats.history_ascii(), "################");
}

#[test]
fn slow_present_stalls_double_buffering_and_reuses_the_current_buffer() {
    let rig = Rig::new(
        SimQueueConfig::DOUBLE,
        SimComposerConfig::INSTANT.with_present_ticks(2 * VSYNC),
    );
    let mut surface = rig.physical(SurfaceConfig::physical(OutputId(0), SIZE));
    let mut driver = FrameDriver::new();

    for _ in 0..8 {
        rig.queue.queue_frame();
        let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
        assert!(
            matches!(report, FrameReport::Presented { .. }),
            "a missing buffer reuses the current one: {report:?}"
        );
        rig.timeline.advance(VSYNC);
    }

    let queue = rig.queue.stats();
    assert!(queue.producer_stalls > 0, "release fences were honored");
    assert!(queue.acquired < 8, "some frames re-presented the held buffer");
    assert_eq!(queue.released_unfenced, 0);
    assert_eq!(rig.queue.held_by_consumer(), 1);
}

#[test]
fn hwc_only_frames_leave_the_queue_alone() {
    let rig = Rig::new(SimQueueConfig::TRIPLE, SimComposerConfig::INSTANT);
    let mut surface = rig.physical(SurfaceConfig::physical(OutputId(0), SIZE));
    let mut driver = FrameDriver::new();

    rig.queue.queue_frame();
    let report = driver.run_frame(
        &mut surface,
        FrameRequest::IDLE,
        |_| CompositionType::HWC,
        no_render,
    );

    assert_eq!(
        report,
        FrameReport::Presented {
            frame_index: 1,
            composition: CompositionType::HWC,
        }
    );
    assert_eq!(rig.queue.stats().acquired, 0);
    assert!(rig.composer.submissions().is_empty());
    assert_eq!(rig.composer.presents(), 1, "the display still presented");
}

#[test]
fn virtual_display_skips_unchanged_frames_until_damage_or_resize() {
    let rig = Rig::new(SimQueueConfig::TRIPLE, SimComposerConfig::INSTANT);
    let mut surface = rig.virtual_display(SurfaceConfig::virtual_display(OutputId(1), SIZE));
    let mut driver = FrameDriver::new();
    let mut renders = 0;

    rig.queue.queue_frame();
    let first = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, |_| renders += 1);
    assert!(matches!(first, FrameReport::Presented { .. }), "nothing valid yet");

    for index in 2..=4 {
        let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, |_| renders += 1);
        assert_eq!(report, FrameReport::Skipped { frame_index: index });
    }
    assert_eq!(renders, 1);
    assert_eq!(rig.queue.stats().acquired, 1, "skipped frames acquire nothing");
    assert_eq!(rig.composer.presents(), 1, "skipped frames present nothing");

    rig.queue.queue_frame();
    let damaged = FrameRequest {
        must_recompose: false,
        damage: &[Rect::new(10.0, 10.0, 50.0, 50.0)],
    };
    let report = driver.run_frame(&mut surface, damaged, gpu, |_| renders += 1);
    assert!(matches!(report, FrameReport::Presented { frame_index: 5, .. }));
    assert_eq!(renders, 2);

    let offscreen = FrameRequest {
        must_recompose: false,
        damage: &[Rect::new(5000.0, 5000.0, 5100.0, 5100.0)],
    };
    let report = driver.run_frame(&mut surface, offscreen, gpu, no_render);
    assert!(
        matches!(report, FrameReport::Skipped { .. }),
        "damage outside the surface is ignored"
    );

    let small = SurfaceSize::new(640, 480);
    surface.resize_buffers(small);
    assert_eq!(rig.queue.default_size(), small);
    rig.queue.queue_frame();
    let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, |_| renders += 1);
    assert!(
        matches!(report, FrameReport::Presented { .. }),
        "resized buffers hold no valid content"
    );
    assert_eq!(renders, 3);

    let report = driver.run_frame(&mut surface, FrameRequest::FORCED, gpu, no_render);
    assert!(
        matches!(report, FrameReport::Presented { .. }),
        "forced recompose reuses the current buffer"
    );
    assert_eq!(rig.queue.stats().acquired, 3);
}

#[test]
fn mixed_virtual_frame_waits_for_render_and_present() {
    let rig = Rig::new(
        SimQueueConfig::TRIPLE.with_render_ticks(8),
        SimComposerConfig::INSTANT.with_present_ticks(4),
    );
    let mut surface = rig.virtual_display(SurfaceConfig::virtual_display(OutputId(1), SIZE));
    let mut driver = FrameDriver::new();

    rig.queue.queue_frame();
    let report = driver.run_frame(
        &mut surface,
        FrameRequest::IDLE,
        |_| CompositionType::MIXED,
        no_render,
    );
    assert!(matches!(report, FrameReport::Presented { .. }));

    let subs = rig.composer.submissions();
    assert_eq!(subs.len(), 2, "output buffer and client target");
    assert!(subs[0].output_buffer);
    assert!(!subs[1].output_buffer);
    assert_eq!(subs[0].slot, subs[1].slot);
    assert!(!subs[1].acquire_signaled);

    let fence = surface.output_fence().clone();
    assert!(!fence.is_signaled());
    rig.timeline.advance(4);
    assert!(!fence.is_signaled(), "present alone is not enough");
    rig.timeline.advance(4);
    assert!(fence.is_signaled());
    assert_eq!(fence.signal_time(), Some(HostTime(8)));
}

#[test]
fn failures_drop_frames_and_the_surface_recovers() {
    let rig = Rig::new(SimQueueConfig::TRIPLE, SimComposerConfig::INSTANT);
    let mut surface = rig.physical(SurfaceConfig::physical(OutputId(0), SIZE));
    let mut driver = FrameDriver::new();
    let mut stats = FrameStats::<4>::new();

    rig.queue.queue_frame();
    stats.observe(&driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render));

    rig.queue.queue_frame();
    rig.composer.reject_next(ComposerError::Rejected);
    let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
    assert_eq!(
        report,
        FrameReport::Dropped {
            op: FrameOp::Advance,
            error: FrameError::ComposerRejected(ComposerError::Rejected),
        }
    );
    stats.observe(&report);
    assert_eq!(surface.state(), FrameState::Idle);
    assert_eq!(
        rig.queue.stats().released_unfenced,
        1,
        "the unread buffer went straight back"
    );
    assert_eq!(rig.queue.held_by_consumer(), 1, "previous image stays held");

    rig.queue.set_readiness(Err(QueueError::Abandoned));
    let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
    assert_eq!(
        report,
        FrameReport::Dropped {
            op: FrameOp::Begin,
            error: FrameError::SourceNotReady(QueueError::Abandoned),
        }
    );
    stats.observe(&report);

    rig.queue.set_readiness(Ok(()));
    rig.queue.queue_frame();
    let report = driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
    assert!(matches!(report, FrameReport::Presented { frame_index: 3, .. }));
    stats.observe(&report);

    assert_eq!(rig.queue.stats().released_unfenced, 1);
    assert_eq!(rig.queue.stats().released, 2);
    assert_eq!(rig.composer.submissions().len(), 2);
    assert_eq!(stats.history_ascii(), "#xx#");
    assert_eq!(stats.report().grade, FrameGrade::D);
}

#[test]
fn unsupported_composition_is_dropped_at_prepare() {
    let rig = Rig::new(SimQueueConfig::TRIPLE, SimComposerConfig::INSTANT);
    let config =
        SurfaceConfig::physical(OutputId(0), SIZE).with_supported(CompositionType::GPU);
    let mut surface = rig.physical(config);
    let mut driver = FrameDriver::new();

    let report = driver.run_frame(
        &mut surface,
        FrameRequest::IDLE,
        |_| CompositionType::HWC,
        no_render,
    );
    assert_eq!(
        report,
        FrameReport::Dropped {
            op: FrameOp::Prepare,
            error: FrameError::UnsupportedComposition {
                requested: CompositionType::HWC,
                supported: CompositionType::GPU,
            },
        }
    );
    assert_eq!(rig.composer.presents(), 0);
}

#[test]
fn prediction_is_offered_only_where_supported() {
    let rig = Rig::new(SimQueueConfig::TRIPLE, SimComposerConfig::INSTANT);
    let config = SurfaceConfig::physical(OutputId(0), SIZE).with_prediction(true);
    let mut surface = rig.physical(config);
    let mut driver = FrameDriver::new();
    let mut seen = Vec::new();

    for ty in [CompositionType::GPU, CompositionType::MIXED, CompositionType::GPU] {
        rig.queue.queue_frame();
        driver.run_frame(
            &mut surface,
            FrameRequest::IDLE,
            |p| {
                seen.push(p);
                ty
            },
            no_render,
        );
    }
    assert_eq!(
        seen,
        [None, Some(CompositionType::GPU), Some(CompositionType::MIXED)]
    );
    assert_eq!(driver.last_composition(), CompositionType::GPU);

    let mut virtual_surface =
        rig.virtual_display(SurfaceConfig::virtual_display(OutputId(1), SIZE));
    rig.queue.queue_frame();
    let mut offered = Some(CompositionType::UNKNOWN);
    driver.run_frame(
        &mut virtual_surface,
        FrameRequest::IDLE,
        |p| {
            offered = p;
            CompositionType::GPU
        },
        no_render,
    );
    assert_eq!(offered, None, "virtual displays never predict");
}

#[test]
fn recorded_trace_exports_one_slice_per_frame() {
    let rig = Rig::new(
        SimQueueConfig::TRIPLE,
        SimComposerConfig::INSTANT.with_present_ticks(VSYNC),
    );
    let recorder = Rc::new(RefCell::new(RecorderSink::with_clock(SteppingClock::new(
        0, 1_000,
    ))));
    let mut surface = rig
        .physical(SurfaceConfig::physical(OutputId(0), SIZE))
        .with_trace_sink(Box::new(recorder.clone()));
    let mut driver = FrameDriver::new().with_hdr_sdr_ratio(2.0);

    for _ in 0..2 {
        rig.queue.queue_frame();
        driver.run_frame(&mut surface, FrameRequest::IDLE, gpu, no_render);
        rig.timeline.advance(VSYNC);
    }

    let bytes = recorder.borrow().as_bytes().to_vec();
    let events: Vec<RecordedEvent> = decode(&bytes).map(|s| s.event).collect();
    let transitions = events
        .iter()
        .filter(|e| matches!(e, RecordedEvent::Transition(_)))
        .count();
    assert_eq!(transitions, 8, "four lifecycle steps per frame");

    let handoffs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::BufferHandoff(h) => Some(*h),
            _ => None,
        })
        .collect();
    assert_eq!(handoffs.len(), 2);
    assert!(handoffs.iter().all(|h| (h.hdr_sdr_ratio - 2.0).abs() < f32::EPSILON));

    let releases: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::Release(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(releases.len(), 1, "only the second frame superseded a slot");
    assert!(releases[0].fence_valid && releases[0].accepted);
    assert!(!releases[0].fence_signaled, "present has not happened yet");

    let mut json = Vec::new();
    scanout_debug::chrome::export(&bytes, Timebase::NANOS, &mut json).unwrap();
    let trace: serde_json::Value = serde_json::from_slice(&json).unwrap();
    let phases: Vec<&str> = trace
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["ph"].as_str())
        .filter(|ph| *ph != "i")
        .collect();
    assert_eq!(phases, ["B", "E", "B", "E"]);
}
