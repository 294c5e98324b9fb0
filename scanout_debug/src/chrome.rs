// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each display becomes a process (`pid` = output id). A frame is a duration
//! slice from `begin_frame` to `on_frame_committed`, or to the point where it
//! was dropped; everything else is an instant event inside it.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use scanout_core::cycle::FrameOp;
use scanout_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`],
/// which must match the clock the recording was made with.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for stamped in decode(bytes) {
        let ts = ticks_to_us(stamped.at.ticks(), timebase);
        let pid = stamped.event.output().0;
        match stamped.event {
            RecordedEvent::Transition(e) => {
                let ph = match e.op {
                    FrameOp::Begin => "B",
                    FrameOp::Commit => "E",
                    _ => "i",
                };
                let name = if ph == "i" { e.op.method() } else { "frame" };
                let mut event = json!({
                    "ph": ph,
                    "name": name,
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                        "from": e.from.name(),
                        "to": e.to.name(),
                    }
                });
                if ph == "i" {
                    event["s"] = json!("t");
                }
                events.push(event);
            }
            RecordedEvent::FrameDropped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameDropped",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "op": e.op.method(),
                        "error": e.error.to_string(),
                    }
                }));
                // A frame dropped after it began still has an open slice.
                if e.op != FrameOp::Begin {
                    events.push(json!({
                        "ph": "E",
                        "name": "frame",
                        "cat": "Lifecycle",
                        "ts": ts,
                        "pid": pid,
                        "tid": 0,
                        "args": {
                            "frame_index": e.frame_index,
                            "dropped": true,
                        }
                    }));
                }
            }
            RecordedEvent::BufferHandoff(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "BufferHandoff",
                    "cat": "Buffers",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "slot": e.slot.0,
                        "composition": e.composition.name(),
                        "acquire_signaled": e.acquire_signaled,
                        "hdr_sdr_ratio": e.hdr_sdr_ratio,
                    }
                }));
            }
            RecordedEvent::Release(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Release",
                    "cat": "Buffers",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "slot": e.slot.0,
                        "fence_valid": e.fence_valid,
                        "fence_signaled": e.fence_signaled,
                        "accepted": e.accepted,
                    }
                }));
            }
            RecordedEvent::Skip(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Skip",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Resize(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Resize",
                    "cat": "Buffers",
                    "ts": ts,
                    "pid": pid,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "old": e.old.to_string(),
                        "new": e.new.to_string(),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    let nanos = timebase.ticks_to_nanos(ticks) as f64;
    nanos / 1000.0
}
