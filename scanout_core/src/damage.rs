// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accumulated damage since the last produced frame.
//!
//! [`Damage`] keeps a single bounding rectangle rather than a region list:
//! surfaces only need to know *whether* anything changed and roughly where,
//! not the exact shape.

use kurbo::Rect;

/// Union of the rectangles damaged since the last produced frame, clipped to
/// the surface bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Damage {
    region: Option<Rect>,
}

impl Damage {
    /// No damage.
    pub const NONE: Self = Self { region: None };

    /// Damage covering all of `bounds`.
    #[must_use]
    pub fn full(bounds: Rect) -> Self {
        let mut damage = Self::NONE;
        damage.add(bounds, bounds);
        damage
    }

    /// Adds `rect`, clipped to `bounds`. Rectangles that end up with zero
    /// area are ignored.
    pub fn add(&mut self, rect: Rect, bounds: Rect) {
        let clipped = rect.abs().intersect(bounds);
        if clipped.is_zero_area() || !clipped.is_finite() {
            return;
        }
        self.region = Some(match self.region {
            Some(r) => r.union(clipped),
            None => clipped,
        });
    }

    /// Returns `true` if nothing was damaged.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.region.is_none()
    }

    /// Bounding box of the damage, if any.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Option<Rect> {
        self.region
    }

    /// Forgets all damage.
    pub fn clear(&mut self) {
        self.region = None;
    }
}
