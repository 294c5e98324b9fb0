// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame lifecycle.
//!
//! This module provides a [`TraceSink`] trait with one method per lifecycle
//! event. Surfaces call them at each transition, buffer handoff and release.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Events carry no timestamps: a surface has no clock of its own. Sinks that
//! need time (such as the recorder in `scanout_debug`) stamp events as they
//! arrive.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::buffer::{SlotIndex, SurfaceSize};
use crate::composition::CompositionType;
use crate::cycle::{FrameOp, FrameState};
use crate::error::FrameError;
use crate::output::OutputId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a lifecycle operation succeeds and moves the cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Which display.
    pub output: OutputId,
    /// Frame counter.
    pub frame_index: u64,
    /// The operation that completed.
    pub op: FrameOp,
    /// State before the operation.
    pub from: FrameState,
    /// State after the operation.
    pub to: FrameState,
}

/// Emitted when a recoverable failure drops the frame in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDroppedEvent {
    /// Which display.
    pub output: OutputId,
    /// Frame counter.
    pub frame_index: u64,
    /// The operation that failed.
    pub op: FrameOp,
    /// Why it failed.
    pub error: FrameError,
}

/// Emitted when a buffer is handed to the composer at `advance_frame`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferHandoffEvent {
    /// Which display.
    pub output: OutputId,
    /// Frame counter.
    pub frame_index: u64,
    /// Slot handed over.
    pub slot: SlotIndex,
    /// Composition type of the frame.
    pub composition: CompositionType,
    /// Whether the acquire fence had already signaled at handoff.
    pub acquire_signaled: bool,
    /// HDR/SDR ratio passed to the composer.
    pub hdr_sdr_ratio: f32,
}

/// Emitted when a superseded slot is returned to the buffer queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseEvent {
    /// Which display.
    pub output: OutputId,
    /// Frame whose commit released the slot.
    pub frame_index: u64,
    /// Slot returned.
    pub slot: SlotIndex,
    /// Whether a real fence (not `NO_FENCE`) travelled with the slot.
    pub fence_valid: bool,
    /// Whether that fence had already signaled.
    pub fence_signaled: bool,
    /// Whether the queue accepted the slot.
    pub accepted: bool,
}

/// Emitted when `begin_frame` decides no buffer needs to be produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipEvent {
    /// Which display.
    pub output: OutputId,
    /// Frame counter.
    pub frame_index: u64,
}

/// Emitted when the surface buffers are resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeEvent {
    /// Which display.
    pub output: OutputId,
    /// Size before the resize.
    pub old: SurfaceSize,
    /// Size after the resize.
    pub new: SurfaceSize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from display surfaces.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
///
/// A surface owns its sink. To read a sink back while the surface is alive,
/// hand the surface an `Rc<RefCell<S>>` and keep a clone.
pub trait TraceSink {
    /// Called when a lifecycle operation completes.
    fn on_transition(&mut self, e: &TransitionEvent) {
        _ = e;
    }

    /// Called when a frame is dropped after a recoverable failure.
    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        _ = e;
    }

    /// Called when a buffer is handed to the composer.
    fn on_buffer_handoff(&mut self, e: &BufferHandoffEvent) {
        _ = e;
    }

    /// Called when a slot is returned to the queue.
    fn on_release(&mut self, e: &ReleaseEvent) {
        _ = e;
    }

    /// Called when a frame skips buffer production.
    fn on_skip(&mut self, e: &SkipEvent) {
        _ = e;
    }

    /// Called when the surface is resized.
    fn on_resize(&mut self, e: &ResizeEvent) {
        _ = e;
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_transition(&mut self, e: &TransitionEvent) {
        self.borrow_mut().on_transition(e);
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.borrow_mut().on_frame_dropped(e);
    }

    fn on_buffer_handoff(&mut self, e: &BufferHandoffEvent) {
        self.borrow_mut().on_buffer_handoff(e);
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        self.borrow_mut().on_release(e);
    }

    fn on_skip(&mut self, e: &SkipEvent) {
        self.borrow_mut().on_skip(e);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        self.borrow_mut().on_resize(e);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Expands to a `Tracer` method that forwards one event to the sink.
macro_rules! emit {
    ($(#[$doc:meta])* $name:ident, $hook:ident, $event:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$event) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$hook(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    emit!(
        /// Emits a [`TransitionEvent`].
        transition, on_transition, TransitionEvent
    );
    emit!(
        /// Emits a [`FrameDroppedEvent`].
        frame_dropped, on_frame_dropped, FrameDroppedEvent
    );
    emit!(
        /// Emits a [`BufferHandoffEvent`].
        buffer_handoff, on_buffer_handoff, BufferHandoffEvent
    );
    emit!(
        /// Emits a [`ReleaseEvent`].
        release, on_release, ReleaseEvent
    );
    emit!(
        /// Emits a [`SkipEvent`].
        skip, on_skip, SkipEvent
    );
    emit!(
        /// Emits a [`ResizeEvent`].
        resize, on_resize, ResizeEvent
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
