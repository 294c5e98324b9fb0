// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One compositor-loop iteration over a display surface.

use kurbo::Rect;

use scanout_core::composition::CompositionType;
use scanout_core::cycle::FrameOp;
use scanout_core::error::FrameError;
use scanout_core::surface::{BeginOutcome, DisplaySurface};

/// Per-frame input from the compositor.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameRequest<'a> {
    /// Force a new buffer even if nothing appears to have changed.
    pub must_recompose: bool,
    /// Regions that changed since the last frame.
    pub damage: &'a [Rect],
}

impl FrameRequest<'static> {
    /// A frame with no damage and no forced recompose.
    pub const IDLE: Self = Self {
        must_recompose: false,
        damage: &[],
    };

    /// A frame that must be recomposed.
    pub const FORCED: Self = Self {
        must_recompose: true,
        damage: &[],
    };
}

/// How a frame ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameReport {
    /// A buffer was produced and committed.
    Presented {
        /// Frame counter.
        frame_index: u64,
        /// How it was composed.
        composition: CompositionType,
    },
    /// Nothing changed; the frame was committed without a new buffer.
    Skipped {
        /// Frame counter.
        frame_index: u64,
    },
    /// The frame was dropped; the previous image stays on screen.
    Dropped {
        /// The call that failed.
        op: FrameOp,
        /// Why.
        error: FrameError,
    },
}

/// Runs frames through a [`DisplaySurface`] in protocol order.
///
/// The driver remembers the last committed composition type and offers it as
/// a prediction to the planner on surfaces that support prediction.
#[derive(Clone, Copy, Debug)]
pub struct FrameDriver {
    hdr_sdr_ratio: f32,
    last_composition: CompositionType,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver {
    /// Creates a driver passing an HDR/SDR ratio of 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hdr_sdr_ratio: 1.0,
            last_composition: CompositionType::UNKNOWN,
        }
    }

    /// Sets the HDR/SDR ratio passed to `advance_frame`.
    #[must_use]
    pub const fn with_hdr_sdr_ratio(mut self, ratio: f32) -> Self {
        self.hdr_sdr_ratio = ratio;
        self
    }

    /// Composition type of the last committed frame.
    #[must_use]
    pub const fn last_composition(&self) -> CompositionType {
        self.last_composition
    }

    /// Runs one frame.
    ///
    /// `plan` receives the predicted composition type (if the surface allows
    /// prediction and a previous frame exists) and returns the type to use.
    /// `render` runs between `prepare_frame` and `advance_frame` for frames
    /// that produce a buffer; it stands in for GPU rendering.
    pub fn run_frame<S, P, R>(
        &mut self,
        surface: &mut S,
        request: FrameRequest<'_>,
        plan: P,
        render: R,
    ) -> FrameReport
    where
        S: DisplaySurface + ?Sized,
        P: FnOnce(Option<CompositionType>) -> CompositionType,
        R: FnOnce(CompositionType),
    {
        for rect in request.damage {
            surface.add_damage(*rect);
        }

        let outcome = match surface.begin_frame(request.must_recompose) {
            Ok(outcome) => outcome,
            Err(error) => {
                return FrameReport::Dropped {
                    op: FrameOp::Begin,
                    error,
                };
            }
        };

        let prediction = (surface.supports_composition_strategy_prediction()
            && self.last_composition != CompositionType::UNKNOWN)
            .then_some(self.last_composition);
        let composition = plan(prediction);
        if let Err(error) = surface.prepare_frame(composition) {
            return FrameReport::Dropped {
                op: FrameOp::Prepare,
                error,
            };
        }

        if outcome == BeginOutcome::Compose {
            render(composition);
        }
        if let Err(error) = surface.advance_frame(self.hdr_sdr_ratio) {
            return FrameReport::Dropped {
                op: FrameOp::Advance,
                error,
            };
        }
        surface.on_frame_committed();
        self.last_composition = composition;

        let frame_index = surface.frame_index();
        match outcome {
            BeginOutcome::Compose => FrameReport::Presented {
                frame_index,
                composition,
            },
            BeginOutcome::Skip => FrameReport::Skipped { frame_index },
        }
    }
}
