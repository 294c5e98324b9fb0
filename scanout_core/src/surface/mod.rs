// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display-surface contract and its variants.
//!
//! A [`DisplaySurface`] coordinates one display's buffers across a frame.
//! The compositor drives it strictly in order:
//!
//! ```rust,ignore
//! fn composite(surface: &mut dyn DisplaySurface) {
//!     match surface.begin_frame(must_recompose) {
//!         Ok(BeginOutcome::Skip) => { /* nothing to render */ }
//!         Ok(BeginOutcome::Compose) => { /* plan, then render */ }
//!         Err(_) => return, // frame dropped, previous image stays
//!     }
//!     if surface.prepare_frame(planned_type).is_err() {
//!         return;
//!     }
//!     // GPU renders into the client target, waiting on
//!     // surface.client_target_acquire_fence() first.
//!     if surface.advance_frame(hdr_sdr_ratio).is_err() {
//!         return;
//!     }
//!     // Composer presents the frame.
//!     surface.on_frame_committed();
//! }
//! ```
//!
//! Two variants are provided, chosen at construction:
//!
//! - [`FramebufferSurface`]: a physical display. Every frame is scanned out;
//!   GPU frames acquire the newest buffer from the queue and hand it to the
//!   composer as the client target.
//! - [`VirtualSurface`]: a virtual display whose output is consumed by
//!   software. It may skip producing a buffer when nothing changed, and it
//!   publishes an output fence for its consumer.
//!
//! [`build_surface`] returns either as a `Box<dyn DisplaySurface>`.

mod common;
mod framebuffer;
mod slots;
mod virtual_display;

#[cfg(test)]
pub(crate) mod testing;

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use kurbo::Rect;

use crate::buffer::{BufferQueue, SurfaceSize};
use crate::composer::Composer;
use crate::composition::CompositionType;
use crate::config::SurfaceConfig;
use crate::cycle::FrameState;
use crate::error::FrameError;
use crate::extension::SurfaceExtension;
use crate::fence::FenceHandle;
use crate::output::OutputId;

pub use framebuffer::FramebufferSurface;
pub use virtual_display::VirtualSurface;

/// What `begin_frame` decided about buffer production.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BeginOutcome {
    /// A new buffer will be produced this frame.
    Compose,
    /// Nothing changed; this frame produces no buffer. The remaining
    /// lifecycle calls must still be made.
    Skip,
}

/// The frame-lifecycle contract between the compositor and a display's
/// buffers.
///
/// Lifecycle methods must be called in order (see [`crate::cycle`]). Calling
/// one out of order panics with a
/// [`ProtocolViolation`](crate::cycle::ProtocolViolation) message.
pub trait DisplaySurface {
    /// Starts a frame, before the composition configuration is known.
    ///
    /// `must_recompose` forces a new buffer even if the surface believes its
    /// previous output is still valid.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::SourceNotReady`] if the buffer source cannot
    /// service a frame. The frame is dropped.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Idle`].
    fn begin_frame(&mut self, must_recompose: bool) -> Result<BeginOutcome, FrameError>;

    /// Records how this frame will be composed.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnsupportedComposition`] if `composition` is
    /// [`CompositionType::UNKNOWN`] or names a path this surface cannot
    /// service. The frame is dropped.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Begun`].
    fn prepare_frame(&mut self, composition: CompositionType) -> Result<(), FrameError>;

    /// Hands the frame's buffer to the composer.
    ///
    /// `hdr_sdr_ratio` is forwarded to the composer unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::AcquireFailed`] or
    /// [`FrameError::ComposerRejected`]. The frame is dropped and any buffer
    /// acquired for it is returned to the queue.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Prepared`]; in particular,
    /// calling it twice without [`on_frame_committed`] in between panics.
    ///
    /// [`on_frame_committed`]: Self::on_frame_committed
    fn advance_frame(&mut self, hdr_sdr_ratio: f32) -> Result<(), FrameError>;

    /// Finishes the frame after the composer committed it, collecting the
    /// release fence for the buffer this frame superseded.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Advanced`].
    fn on_frame_committed(&mut self);

    /// Fence that signals when the client target is safe to render into.
    ///
    /// Never blocks and is valid in every state; returns
    /// [`FenceHandle::NO_FENCE`] when nothing is pending.
    fn client_target_acquire_fence(&self) -> &FenceHandle;

    /// Changes the buffer size. The next frame is recomposed regardless of
    /// its `must_recompose` flag.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Idle`].
    fn resize_buffers(&mut self, size: SurfaceSize);

    /// Records that `rect` changed since the last produced frame.
    ///
    /// # Panics
    ///
    /// Panics unless the surface is [`FrameState::Idle`] or
    /// [`FrameState::Begun`].
    fn add_damage(&mut self, rect: Rect);

    /// Whether the compositor may predict the composition strategy before
    /// `prepare_frame`.
    fn supports_composition_strategy_prediction(&self) -> bool {
        false
    }

    /// The vendor extension attached at construction, if any.
    fn extension(&mut self) -> Option<&mut dyn SurfaceExtension> {
        None
    }

    /// Current lifecycle state.
    fn state(&self) -> FrameState;

    /// Index of the current frame, or of the last one if idle.
    fn frame_index(&self) -> u64;

    /// Display this surface scans out to.
    fn output(&self) -> OutputId;

    /// Current buffer size.
    fn size(&self) -> SurfaceSize;

    /// Composition type of the current frame, or of the last committed frame
    /// if idle.
    fn composition(&self) -> CompositionType;

    /// Writes a human-readable description of the surface state.
    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Returns [`dump`](Self::dump) output as a string.
    fn dump_as_string(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` cannot fail.
        _ = self.dump(&mut out);
        out
    }
}

/// Which surface variant [`build_surface`] creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// A [`FramebufferSurface`].
    Physical,
    /// A [`VirtualSurface`].
    Virtual,
}

/// Creates a surface of the given kind behind a trait object.
#[must_use]
pub fn build_surface<Q, C>(
    kind: SurfaceKind,
    config: SurfaceConfig,
    queue: Q,
    composer: C,
) -> Box<dyn DisplaySurface>
where
    Q: BufferQueue + 'static,
    C: Composer + 'static,
{
    match kind {
        SurfaceKind::Physical => Box::new(FramebufferSurface::new(config, queue, composer)),
        SurfaceKind::Virtual => Box::new(VirtualSurface::new(config, queue, composer)),
    }
}
