// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition-type negotiation.
//!
//! [`CompositionType`] records which hardware path produced a frame. It is a
//! bit set rather than a plain enum so that [`MIXED`](CompositionType::MIXED)
//! answers "did the GPU take part?" with a single mask test:
//!
//! ```
//! use scanout_core::composition::CompositionType;
//!
//! assert_eq!(CompositionType::MIXED & CompositionType::GPU, CompositionType::GPU);
//! assert_eq!(CompositionType::MIXED & CompositionType::HWC, CompositionType::HWC);
//! assert!((CompositionType::GPU & CompositionType::HWC).is_empty());
//! ```

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Which path or paths produced the pixels of the current frame.
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompositionType: u8 {
        /// The GPU renderer composed layers into the client target.
        const GPU = 0b01;
        /// The hardware composer composed layers directly.
        const HWC = 0b10;
        /// Both paths contributed to the frame.
        const MIXED = Self::GPU.bits() | Self::HWC.bits();
    }
}

impl CompositionType {
    /// No composition decision has been made.
    pub const UNKNOWN: Self = Self::empty();

    /// Returns `true` if the GPU path contributed to the frame, which means a
    /// client-target buffer must be produced.
    #[inline]
    #[must_use]
    pub const fn uses_gpu(self) -> bool {
        self.intersects(Self::GPU)
    }

    /// Returns `true` if the hardware composer contributed to the frame.
    #[inline]
    #[must_use]
    pub const fn uses_hwc(self) -> bool {
        self.intersects(Self::HWC)
    }

    /// Returns `true` if `self` names at least one path and every path it
    /// names is in `supported`.
    #[inline]
    #[must_use]
    pub const fn is_serviceable_by(self, supported: Self) -> bool {
        !self.is_empty() && supported.contains(self)
    }

    /// Returns the short name used in dumps and trace output.
    ///
    /// Values carrying bits outside `GPU | HWC` are reported as `Invalid`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.bits() {
            0b00 => "Unknown",
            0b01 => "Gpu",
            0b10 => "Hwc",
            0b11 => "Mixed",
            _ => "Invalid",
        }
    }
}

impl Default for CompositionType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Debug for CompositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositionType::{}", self.name())
    }
}

impl fmt::Display for CompositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
