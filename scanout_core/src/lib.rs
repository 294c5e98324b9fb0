// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame lifecycle and buffer handoff for display surfaces.
//!
//! `scanout_core` sits between a compositor and the two subsystems that own a
//! display's pixels: the buffer queue the GPU renders into, and the hardware
//! composer that scans buffers out. It is `no_std` compatible (with `alloc`)
//! and owns no threads, clocks, or devices; both subsystems are reached
//! through traits.
//!
//! # Architecture
//!
//! Each frame walks a fixed sequence of calls on a
//! [`DisplaySurface`](surface::DisplaySurface):
//!
//! ```text
//!   begin_frame(must_recompose) ──► Compose | Skip
//!       │
//!       ▼
//!   prepare_frame(CompositionType)
//!       │
//!       ▼
//!   advance_frame(hdr_sdr_ratio) ──► BufferQueue::acquire
//!       │                            Composer::set_client_target
//!       ▼
//!   on_frame_committed() ─────────► Composer::present_fence
//!                                   BufferQueue::release(superseded, fence)
//! ```
//!
//! A recoverable failure at any step drops the frame and returns the surface
//! to idle; the previous image stays on screen. Calling a step out of order
//! is a programming error and panics.
//!
//! **[`surface`]**: The [`DisplaySurface`](surface::DisplaySurface) trait
//! with its physical ([`FramebufferSurface`](surface::FramebufferSurface)) and
//! virtual ([`VirtualSurface`](surface::VirtualSurface)) variants.
//!
//! **[`cycle`]**: The lifecycle state machine guarding every call.
//!
//! **[`composition`]**: [`CompositionType`](composition::CompositionType)
//! bit flags for the GPU and composer paths.
//!
//! **[`buffer`]**, **[`composer`]**: The collaborator traits a surface
//! drives.
//!
//! **[`fence`]**: Shareable fence handles with a `NO_FENCE` sentinel and
//! merging.
//!
//! **[`damage`]**: Accumulated damage deciding whether a virtual frame can
//! be skipped.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! lifecycle instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod composer;
pub mod composition;
pub mod config;
pub mod cycle;
pub mod damage;
pub mod error;
pub mod extension;
pub mod fence;
pub mod output;
pub mod surface;
pub mod time;
pub mod trace;
