// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable frame failures.
//!
//! A [`FrameError`] means this frame cannot be produced right now. The surface
//! has already dropped the frame and returned to `Idle`; the compositor should
//! skip it and leave the previous image on screen. Out-of-order calls are not
//! reported here: they are [`ProtocolViolation`](crate::cycle::ProtocolViolation)s
//! and panic.

use core::fmt;

use crate::buffer::QueueError;
use crate::composer::ComposerError;
use crate::composition::CompositionType;

/// Why a frame was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer source cannot service a frame at `begin_frame`.
    SourceNotReady(QueueError),
    /// The surface cannot service the requested composition type.
    UnsupportedComposition {
        /// The type passed to `prepare_frame`.
        requested: CompositionType,
        /// The types this surface supports.
        supported: CompositionType,
    },
    /// Acquiring the buffer to present failed at `advance_frame`.
    AcquireFailed(QueueError),
    /// The composer refused the buffer at `advance_frame`.
    ComposerRejected(ComposerError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotReady(e) => write!(f, "buffer source not ready: {e}"),
            Self::UnsupportedComposition {
                requested,
                supported,
            } => write!(
                f,
                "composition type {requested} not supported (surface supports {supported})"
            ),
            Self::AcquireFailed(e) => write!(f, "buffer acquisition failed: {e}"),
            Self::ComposerRejected(e) => write!(f, "client target not accepted: {e}"),
        }
    }
}

impl core::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::SourceNotReady(e) | Self::AcquireFailed(e) => Some(e),
            Self::ComposerRejected(e) => Some(e),
            Self::UnsupportedComposition { .. } => None,
        }
    }
}

impl From<ComposerError> for FrameError {
    fn from(e: ComposerError) -> Self {
        Self::ComposerRejected(e)
    }
}
