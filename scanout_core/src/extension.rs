// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vendor extension hook.
//!
//! Some deployments attach platform-specific state to a display surface
//! (panel refresh tricks, vendor composer knobs). Rather than widening the
//! surface contract, such state lives in a [`SurfaceExtension`] injected at
//! construction and reached through
//! [`DisplaySurface::extension`](crate::surface::DisplaySurface::extension).
//! Deployments without one simply get `None`.

use core::any::Any;
use core::fmt;

/// Platform-specific state attached to a surface.
pub trait SurfaceExtension: fmt::Debug {
    /// Short identifier, shown in dumps.
    fn name(&self) -> &str;

    /// Appends extension state to a surface dump.
    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        _ = out;
        Ok(())
    }

    /// Upcast for downcasting to the concrete extension type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete extension type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
