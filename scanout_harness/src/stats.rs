// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-outcome statistics and grading.

use alloc::string::String;

use crate::driver::FrameReport;

/// Letter grade for how reliably a surface produces frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameGrade {
    /// Virtually no drops.
    A,
    /// Occasional drops.
    B,
    /// Frequent drops.
    C,
    /// The display is visibly stuttering.
    D,
}

impl FrameGrade {
    /// Returns a short label for HUD rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    fn for_drop_rate(drops_per_1000: f64) -> Self {
        if drops_per_1000 < 1.0 {
            Self::A
        } else if drops_per_1000 < 10.0 {
            Self::B
        } else if drops_per_1000 < 50.0 {
            Self::C
        } else {
            Self::D
        }
    }
}

/// Aggregated report returned by [`FrameStats::observe`].
#[derive(Clone, Copy, Debug)]
pub struct StatsReport {
    /// Current grade.
    pub grade: FrameGrade,
    /// Drops per 1000 observed frames.
    pub drops_per_1000: f64,
    /// Total frames observed.
    pub total_frames: u64,
    /// Frames that produced a buffer.
    pub presented: u64,
    /// Frames skipped as unchanged.
    pub skipped: u64,
    /// Frames dropped.
    pub dropped: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Presented,
    Skipped,
    Dropped,
}

/// Rolling frame-outcome tracker with a fixed-size history.
#[derive(Debug)]
pub struct FrameStats<const N: usize> {
    history: [Option<Outcome>; N],
    cursor: usize,
    presented: u64,
    skipped: u64,
    dropped: u64,
}

impl<const N: usize> Default for FrameStats<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameStats<N> {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: [None; N],
            cursor: 0,
            presented: 0,
            skipped: 0,
            dropped: 0,
        }
    }

    /// Observes one frame and returns an updated report.
    pub fn observe(&mut self, report: &FrameReport) -> StatsReport {
        let outcome = match report {
            FrameReport::Presented { .. } => {
                self.presented = self.presented.saturating_add(1);
                Outcome::Presented
            }
            FrameReport::Skipped { .. } => {
                self.skipped = self.skipped.saturating_add(1);
                Outcome::Skipped
            }
            FrameReport::Dropped { .. } => {
                self.dropped = self.dropped.saturating_add(1);
                Outcome::Dropped
            }
        };
        if N > 0 {
            self.history[self.cursor] = Some(outcome);
            self.cursor = (self.cursor + 1) % N;
        }
        self.report()
    }

    /// Current totals without observing a frame.
    #[must_use]
    pub fn report(&self) -> StatsReport {
        let total_frames = self.presented + self.skipped + self.dropped;
        let drops_per_1000 = if total_frames == 0 {
            0.0
        } else {
            self.dropped as f64 * 1000.0 / total_frames as f64
        };
        StatsReport {
            grade: FrameGrade::for_drop_rate(drops_per_1000),
            drops_per_1000,
            total_frames,
            presented: self.presented,
            skipped: self.skipped,
            dropped: self.dropped,
        }
    }

    /// Returns the recent history oldest→newest as ASCII: `#` presented,
    /// `.` skipped, `x` dropped, space for not yet observed.
    #[must_use]
    pub fn history_ascii(&self) -> String {
        let mut out = String::with_capacity(N);
        for i in 0..N {
            out.push(match self.history[(self.cursor + i) % N] {
                Some(Outcome::Presented) => '#',
                Some(Outcome::Skipped) => '.',
                Some(Outcome::Dropped) => 'x',
                None => ' ',
            });
        }
        out
    }
}
