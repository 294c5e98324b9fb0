// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed with a tag
//! and the [`HostTime`] at which the sink received it. [`decode`] reads them
//! back as an iterator of [`Stamped`] events.

use scanout_core::buffer::{QueueError, SlotIndex, SurfaceSize};
use scanout_core::composer::ComposerError;
use scanout_core::composition::CompositionType;
use scanout_core::cycle::{FrameOp, FrameState};
use scanout_core::error::FrameError;
use scanout_core::output::OutputId;
use scanout_core::time::HostTime;
use scanout_core::trace::{
    BufferHandoffEvent, FrameDroppedEvent, ReleaseEvent, ResizeEvent, SkipEvent, TraceSink,
    TransitionEvent,
};

use crate::clock::{Clock, MonotonicClock};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TRANSITION: u8 = 1;
const TAG_FRAME_DROPPED: u8 = 2;
const TAG_BUFFER_HANDOFF: u8 = 3;
const TAG_RELEASE: u8 = 4;
const TAG_SKIP: u8 = 5;
const TAG_RESIZE: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink<K: Clock = MonotonicClock> {
    buf: Vec<u8>,
    clock: K,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder stamping events with a [`MonotonicClock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl<K: Clock> RecorderSink<K> {
    /// Creates an empty recorder stamping events with `clock`.
    #[must_use]
    pub fn with_clock(clock: K) -> Self {
        Self {
            buf: Vec::new(),
            clock,
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_header(&mut self, tag: u8, output: OutputId, frame_index: u64) {
        let now = self.clock.now();
        self.write_u8(tag);
        self.write_u64(now.ticks());
        self.write_u32(output.0);
        self.write_u64(frame_index);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_size(&mut self, s: SurfaceSize) {
        self.write_u32(s.width);
        self.write_u32(s.height);
    }

    /// Three bytes: kind, then two payload bytes.
    fn write_error(&mut self, e: FrameError) {
        let [kind, a, b] = match e {
            FrameError::SourceNotReady(q) => {
                let [k, s] = queue_error_bytes(q);
                [0, k, s]
            }
            FrameError::UnsupportedComposition {
                requested,
                supported,
            } => [1, requested.bits(), supported.bits()],
            FrameError::AcquireFailed(q) => {
                let [k, s] = queue_error_bytes(q);
                [2, k, s]
            }
            FrameError::ComposerRejected(c) => [
                3,
                match c {
                    ComposerError::Rejected => 0,
                    ComposerError::Unsupported => 1,
                    ComposerError::Disconnected => 2,
                },
                0,
            ],
        };
        self.write_u8(kind);
        self.write_u8(a);
        self.write_u8(b);
    }
}

fn queue_error_bytes(e: QueueError) -> [u8; 2] {
    match e {
        QueueError::NoBufferAvailable => [0, 0],
        QueueError::Timeout => [1, 0],
        QueueError::Abandoned => [2, 0],
        QueueError::InvalidSlot(slot) => [3, slot.0],
    }
}

fn queue_error_from(kind: u8, slot: u8) -> QueueError {
    match kind {
        0 => QueueError::NoBufferAvailable,
        1 => QueueError::Timeout,
        2 => QueueError::Abandoned,
        _ => QueueError::InvalidSlot(SlotIndex(slot)),
    }
}

fn op_byte(op: FrameOp) -> u8 {
    match op {
        FrameOp::Begin => 0,
        FrameOp::Prepare => 1,
        FrameOp::Advance => 2,
        FrameOp::Commit => 3,
        FrameOp::Resize => 4,
        FrameOp::Damage => 5,
    }
}

fn op_from(v: u8) -> Option<FrameOp> {
    Some(match v {
        0 => FrameOp::Begin,
        1 => FrameOp::Prepare,
        2 => FrameOp::Advance,
        3 => FrameOp::Commit,
        4 => FrameOp::Resize,
        5 => FrameOp::Damage,
        _ => return None,
    })
}

fn state_byte(state: FrameState) -> u8 {
    match state {
        FrameState::Idle => 0,
        FrameState::Begun => 1,
        FrameState::Prepared => 2,
        FrameState::Advanced => 3,
    }
}

fn state_from(v: u8) -> Option<FrameState> {
    Some(match v {
        0 => FrameState::Idle,
        1 => FrameState::Begun,
        2 => FrameState::Prepared,
        3 => FrameState::Advanced,
        _ => return None,
    })
}

impl<K: Clock> TraceSink for RecorderSink<K> {
    fn on_transition(&mut self, e: &TransitionEvent) {
        self.write_header(TAG_TRANSITION, e.output, e.frame_index);
        self.write_u8(op_byte(e.op));
        self.write_u8(state_byte(e.from));
        self.write_u8(state_byte(e.to));
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.write_header(TAG_FRAME_DROPPED, e.output, e.frame_index);
        self.write_u8(op_byte(e.op));
        self.write_error(e.error);
    }

    fn on_buffer_handoff(&mut self, e: &BufferHandoffEvent) {
        self.write_header(TAG_BUFFER_HANDOFF, e.output, e.frame_index);
        self.write_u8(e.slot.0);
        self.write_u8(e.composition.bits());
        self.write_bool(e.acquire_signaled);
        self.write_u32(e.hdr_sdr_ratio.to_bits());
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        self.write_header(TAG_RELEASE, e.output, e.frame_index);
        self.write_u8(e.slot.0);
        self.write_bool(e.fence_valid);
        self.write_bool(e.fence_signaled);
        self.write_bool(e.accepted);
    }

    fn on_skip(&mut self, e: &SkipEvent) {
        self.write_header(TAG_SKIP, e.output, e.frame_index);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        // Resizes happen between frames; the frame slot is unused.
        self.write_header(TAG_RESIZE, e.output, 0);
        self.write_size(e.old);
        self.write_size(e.new);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`TransitionEvent`].
    Transition(TransitionEvent),
    /// A [`FrameDroppedEvent`].
    FrameDropped(FrameDroppedEvent),
    /// A [`BufferHandoffEvent`].
    BufferHandoff(BufferHandoffEvent),
    /// A [`ReleaseEvent`].
    Release(ReleaseEvent),
    /// A [`SkipEvent`].
    Skip(SkipEvent),
    /// A [`ResizeEvent`].
    Resize(ResizeEvent),
}

impl RecordedEvent {
    /// Display the event concerns.
    #[must_use]
    pub fn output(&self) -> OutputId {
        match self {
            Self::Transition(e) => e.output,
            Self::FrameDropped(e) => e.output,
            Self::BufferHandoff(e) => e.output,
            Self::Release(e) => e.output,
            Self::Skip(e) => e.output,
            Self::Resize(e) => e.output,
        }
    }
}

/// A recorded event with the time the sink received it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stamped {
    /// When the sink received the event, in the recording clock's ticks.
    pub at: HostTime,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Stamped`] events.
///
/// Iteration stops at the first truncated or unrecognized record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_size(&mut self) -> Option<SurfaceSize> {
        Some(SurfaceSize::new(self.read_u32()?, self.read_u32()?))
    }

    fn read_composition(&mut self) -> Option<CompositionType> {
        self.read_u8().map(CompositionType::from_bits_truncate)
    }

    fn read_error(&mut self) -> Option<FrameError> {
        let [kind, a, b] = self.take::<3>()?;
        Some(match kind {
            0 => FrameError::SourceNotReady(queue_error_from(a, b)),
            1 => FrameError::UnsupportedComposition {
                requested: CompositionType::from_bits_truncate(a),
                supported: CompositionType::from_bits_truncate(b),
            },
            2 => FrameError::AcquireFailed(queue_error_from(a, b)),
            3 => FrameError::ComposerRejected(match a {
                0 => ComposerError::Rejected,
                1 => ComposerError::Unsupported,
                _ => ComposerError::Disconnected,
            }),
            _ => return None,
        })
    }

    fn decode_record(&mut self, tag: u8) -> Option<Stamped> {
        let at = HostTime(self.read_u64()?);
        let output = OutputId(self.read_u32()?);
        let frame_index = self.read_u64()?;
        let event = match tag {
            TAG_TRANSITION => RecordedEvent::Transition(TransitionEvent {
                output,
                frame_index,
                op: op_from(self.read_u8()?)?,
                from: state_from(self.read_u8()?)?,
                to: state_from(self.read_u8()?)?,
            }),
            TAG_FRAME_DROPPED => RecordedEvent::FrameDropped(FrameDroppedEvent {
                output,
                frame_index,
                op: op_from(self.read_u8()?)?,
                error: self.read_error()?,
            }),
            TAG_BUFFER_HANDOFF => RecordedEvent::BufferHandoff(BufferHandoffEvent {
                output,
                frame_index,
                slot: SlotIndex(self.read_u8()?),
                composition: self.read_composition()?,
                acquire_signaled: self.read_bool()?,
                hdr_sdr_ratio: f32::from_bits(self.read_u32()?),
            }),
            TAG_RELEASE => RecordedEvent::Release(ReleaseEvent {
                output,
                frame_index,
                slot: SlotIndex(self.read_u8()?),
                fence_valid: self.read_bool()?,
                fence_signaled: self.read_bool()?,
                accepted: self.read_bool()?,
            }),
            TAG_SKIP => RecordedEvent::Skip(SkipEvent {
                output,
                frame_index,
            }),
            TAG_RESIZE => RecordedEvent::Resize(ResizeEvent {
                output,
                old: self.read_size()?,
                new: self.read_size()?,
            }),
            _ => return None,
        };
        Some(Stamped { at, event })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Stamped;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let record = self.decode_record(tag);
        if record.is_none() {
            // Stop for good rather than resynchronizing mid-record.
            self.pos = self.data.len();
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
