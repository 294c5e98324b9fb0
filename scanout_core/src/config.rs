// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface configuration.

use crate::buffer::SurfaceSize;
use crate::composition::CompositionType;
use crate::output::OutputId;

/// When a surface may skip producing a buffer for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecomposePolicy {
    /// Every frame produces a buffer.
    Always,
    /// A frame may be skipped when recomposition is not forced, the previous
    /// output is still valid, and no damage accumulated since it was produced.
    SkipWhenUnchanged,
}

/// Construction-time configuration for a display surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceConfig {
    /// Display the surface scans out to.
    pub output: OutputId,
    /// Initial buffer size.
    pub size: SurfaceSize,
    /// Composition types the surface can service.
    pub supported: CompositionType,
    /// Whether the surface supports composition-strategy prediction.
    pub predict_composition: bool,
    /// Skip policy for unchanged frames.
    pub recompose: RecomposePolicy,
}

impl SurfaceConfig {
    /// Default configuration for a physical display.
    #[must_use]
    pub const fn physical(output: OutputId, size: SurfaceSize) -> Self {
        Self {
            output,
            size,
            supported: CompositionType::MIXED,
            predict_composition: false,
            recompose: RecomposePolicy::Always,
        }
    }

    /// Default configuration for a virtual display.
    #[must_use]
    pub const fn virtual_display(output: OutputId, size: SurfaceSize) -> Self {
        Self {
            output,
            size,
            supported: CompositionType::MIXED,
            predict_composition: false,
            recompose: RecomposePolicy::SkipWhenUnchanged,
        }
    }

    /// Restricts the composition types the surface accepts.
    #[must_use]
    pub const fn with_supported(mut self, supported: CompositionType) -> Self {
        self.supported = supported;
        self
    }

    /// Enables or disables composition-strategy prediction.
    #[must_use]
    pub const fn with_prediction(mut self, enabled: bool) -> Self {
        self.predict_composition = enabled;
        self
    }

    /// Sets the skip policy.
    #[must_use]
    pub const fn with_recompose(mut self, policy: RecomposePolicy) -> Self {
        self.recompose = policy;
        self
    }
}
