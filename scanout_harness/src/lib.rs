// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulation of the subsystems around a display surface.
//!
//! The harness supplies in-memory implementations of the traits a
//! [`DisplaySurface`](scanout_core::surface::DisplaySurface) drives, all
//! sharing one manually advanced [`FenceTimeline`]:
//!
//! - [`SimBufferQueue`] plays the GPU producer and the queue's consumer end.
//!   The producer only reuses a slot once its release fence has signaled.
//! - [`SimComposer`] records every buffer handed to it and returns present
//!   fences that signal after a configurable latency.
//! - [`FrameDriver`] runs one compositor-loop iteration in protocol order.
//! - [`FrameStats`] grades a run by its drop rate.
//!
//! ```
//! use scanout_core::buffer::SurfaceSize;
//! use scanout_core::composition::CompositionType;
//! use scanout_core::config::SurfaceConfig;
//! use scanout_core::output::OutputId;
//! use scanout_core::surface::FramebufferSurface;
//! use scanout_harness::{
//!     FenceTimeline, FrameDriver, FrameReport, FrameRequest, SimBufferQueue, SimComposer,
//!     SimComposerConfig, SimQueueConfig,
//! };
//!
//! let timeline = FenceTimeline::new();
//! let queue = SimBufferQueue::new(SimQueueConfig::TRIPLE, timeline.clone());
//! let composer = SimComposer::new(SimComposerConfig::INSTANT, timeline.clone());
//! let config = SurfaceConfig::physical(OutputId(0), SurfaceSize::new(1920, 1080));
//! let mut surface = FramebufferSurface::new(config, queue.clone(), composer);
//!
//! let mut driver = FrameDriver::new();
//! queue.queue_frame();
//! let report = driver.run_frame(
//!     &mut surface,
//!     FrameRequest::IDLE,
//!     |_| CompositionType::GPU,
//!     |_| {},
//! );
//! assert!(matches!(report, FrameReport::Presented { frame_index: 1, .. }));
//! ```

#![no_std]

extern crate alloc;

pub mod composer;
pub mod driver;
pub mod queue;
pub mod stats;
pub mod timeline;

#[cfg(test)]
mod scenarios;

pub use composer::{SimComposer, SimComposerConfig, Submission};
pub use driver::{FrameDriver, FrameReport, FrameRequest};
pub use queue::{QueueStats, SimBufferQueue, SimQueueConfig};
pub use stats::{FrameGrade, FrameStats, StatsReport};
pub use timeline::FenceTimeline;
