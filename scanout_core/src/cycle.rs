// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame lifecycle state machine.
//!
//! Every surface moves through the same four states, one frame at a time:
//!
//! ```text
//!          begin_frame          prepare_frame          advance_frame
//!   Idle ──────────────► Begun ──────────────► Prepared ──────────────► Advanced
//!    ▲                                                                     │
//!    └─────────────────────────── on_frame_committed ◄─────────────────────┘
//! ```
//!
//! A recoverable failure in `begin_frame`, `prepare_frame`, or
//! `advance_frame` drops the frame and returns the cycle to `Idle`; nothing
//! was handed to the hardware, so the previous image stays on screen.
//!
//! Calling an operation from any other state is a [`ProtocolViolation`]. It
//! means the compositor loop is broken, so [`FrameCycle::guard`] panics
//! rather than reporting it: the strict ordering is the only thing keeping the
//! GPU and the composer from touching the same buffer at once.

use core::fmt;

/// Where a surface is within the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FrameState {
    /// Between frames. Resizing is only allowed here.
    #[default]
    Idle,
    /// `begin_frame` succeeded; composition planning is in progress.
    Begun,
    /// `prepare_frame` recorded the composition type.
    Prepared,
    /// `advance_frame` handed the frame to the hardware. Only
    /// `on_frame_committed` may follow.
    Advanced,
}

impl FrameState {
    /// Returns the short name used in dumps and trace output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Begun => "begun",
            Self::Prepared => "prepared",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A surface operation subject to the lifecycle guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameOp {
    /// `begin_frame`.
    Begin,
    /// `prepare_frame`.
    Prepare,
    /// `advance_frame`.
    Advance,
    /// `on_frame_committed`.
    Commit,
    /// `resize_buffers`.
    Resize,
    /// `add_damage`.
    Damage,
}

impl FrameOp {
    /// Returns `true` if the operation may be called in `state`.
    #[must_use]
    pub const fn permitted_in(self, state: FrameState) -> bool {
        matches!(
            (self, state),
            (Self::Begin | Self::Resize, FrameState::Idle)
                | (Self::Prepare, FrameState::Begun)
                | (Self::Advance, FrameState::Prepared)
                | (Self::Commit, FrameState::Advanced)
                | (Self::Damage, FrameState::Idle | FrameState::Begun)
        )
    }

    /// Returns the state a successful call leaves the cycle in.
    #[must_use]
    pub const fn target(self, from: FrameState) -> FrameState {
        match self {
            Self::Begin => FrameState::Begun,
            Self::Prepare => FrameState::Prepared,
            Self::Advance => FrameState::Advanced,
            Self::Commit => FrameState::Idle,
            Self::Resize | Self::Damage => from,
        }
    }

    /// Returns the name of the surface method.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Begin => "begin_frame",
            Self::Prepare => "prepare_frame",
            Self::Advance => "advance_frame",
            Self::Commit => "on_frame_committed",
            Self::Resize => "resize_buffers",
            Self::Damage => "add_damage",
        }
    }
}

/// An operation was called from a state that does not allow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolViolation {
    /// The operation that was attempted.
    pub op: FrameOp,
    /// The state the cycle was in.
    pub state: FrameState,
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame protocol violation: {} called while {}",
            self.op.method(),
            self.state
        )
    }
}

impl core::error::Error for ProtocolViolation {}

/// The lifecycle guard owned by each surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCycle {
    state: FrameState,
    frame_index: u64,
}

impl FrameCycle {
    /// Creates a cycle in [`FrameState::Idle`] with no frames started.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FrameState::Idle,
            frame_index: 0,
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Index of the current frame, or of the last frame if `Idle`. The first
    /// frame is 1; 0 means no frame has begun yet.
    #[inline]
    #[must_use]
    pub const fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Checks whether `op` may run now, without panicking.
    pub const fn check(&self, op: FrameOp) -> Result<(), ProtocolViolation> {
        if op.permitted_in(self.state) {
            Ok(())
        } else {
            Err(ProtocolViolation {
                op,
                state: self.state,
            })
        }
    }

    /// Asserts that `op` may run now.
    ///
    /// # Panics
    ///
    /// Panics with the [`ProtocolViolation`] message if it may not. The cycle
    /// is not modified.
    #[track_caller]
    pub fn guard(&self, op: FrameOp) {
        if let Err(violation) = self.check(op) {
            panic!("{violation}");
        }
    }

    /// Records the successful completion of `op` and returns the state the
    /// cycle moved out of.
    ///
    /// A successful [`FrameOp::Begin`] starts a new frame index.
    pub fn complete(&mut self, op: FrameOp) -> FrameState {
        debug_assert!(
            op.permitted_in(self.state),
            "complete() without a passing guard()"
        );
        let from = self.state;
        if op == FrameOp::Begin {
            self.frame_index += 1;
        }
        self.state = op.target(from);
        from
    }

    /// Drops the frame in progress after a recoverable failure and returns
    /// the state the cycle moved out of.
    ///
    /// Must not be called once the frame was advanced: a handed-off frame
    /// has to be carried through `on_frame_committed`.
    pub fn abandon(&mut self) -> FrameState {
        debug_assert!(
            self.state != FrameState::Advanced,
            "an advanced frame cannot be abandoned"
        );
        core::mem::take(&mut self.state)
    }
}
