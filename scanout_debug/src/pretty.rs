// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Each line is
//! prefixed with the time since the sink was created, in microseconds.

use std::io::Write;

use scanout_core::time::{HostTime, Timebase};
use scanout_core::trace::{
    BufferHandoffEvent, FrameDroppedEvent, ReleaseEvent, ResizeEvent, SkipEvent, TraceSink,
    TransitionEvent,
};

use crate::clock::{Clock, MonotonicClock};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    clock: Box<dyn Clock>,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("clock", &self.clock)
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            clock: Box::new(MonotonicClock::new()),
            timebase: Timebase::NANOS,
        }
    }

    /// Replaces the timestamp source. `timebase` converts its ticks to
    /// nanoseconds.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>, timebase: Timebase) -> Self {
        self.clock = clock;
        self.timebase = timebase;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn stamp(&mut self) -> f64 {
        let now: HostTime = self.clock.now();
        let nanos = self.timebase.ticks_to_nanos(now.ticks()) as f64;
        nanos / 1000.0
    }
}

fn fence_word(valid: bool, signaled: bool) -> &'static str {
    match (valid, signaled) {
        (false, _) => "none",
        (true, true) => "signaled",
        (true, false) => "pending",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_transition(&mut self, e: &TransitionEvent) {
        let at = self.stamp();
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} frame={} {} {} -> {}",
            e.output,
            e.frame_index,
            e.op.method(),
            e.from,
            e.to,
        );
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        let at = self.stamp();
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} frame={} DROPPED at {}: {}",
            e.output,
            e.frame_index,
            e.op.method(),
            e.error,
        );
    }

    fn on_buffer_handoff(&mut self, e: &BufferHandoffEvent) {
        let at = self.stamp();
        let acquire = if e.acquire_signaled {
            "signaled"
        } else {
            "pending"
        };
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} frame={} handoff slot={} {} acquire={acquire} hdr/sdr={:.2}",
            e.output, e.frame_index, e.slot, e.composition, e.hdr_sdr_ratio,
        );
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        let at = self.stamp();
        let outcome = if e.accepted { "accepted" } else { "REFUSED" };
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} frame={} release slot={} fence={} {outcome}",
            e.output,
            e.frame_index,
            e.slot,
            fence_word(e.fence_valid, e.fence_signaled),
        );
    }

    fn on_skip(&mut self, e: &SkipEvent) {
        let at = self.stamp();
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} frame={} skip (unchanged)",
            e.output, e.frame_index,
        );
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        let at = self.stamp();
        let _ = writeln!(
            self.writer,
            "[{at:>10.1}µs] {} resize {} -> {}",
            e.output, e.old, e.new,
        );
    }
}
