// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque synchronization fences.
//!
//! A [`Fence`] marks the point at which a buffer becomes safe to read or
//! reuse. Fences are produced by the GPU driver, the buffer queue, or the
//! hardware composer; the core only stores and forwards them. It never waits
//! on one: blocking is the job of whichever driver consumes the fence.
//!
//! [`FenceHandle`] is the shared, cheaply clonable reference the core passes
//! around. Its empty value, [`FenceHandle::NO_FENCE`], is a valid fence that
//! is already signaled.

use alloc::sync::Arc;
use core::fmt;

use crate::time::HostTime;

/// A synchronization primitive whose completion is driven by hardware.
///
/// Implementations wrap a platform object (a sync file descriptor, an
/// `EGLSync`, a Vulkan semaphore). Both methods must return immediately.
pub trait Fence: fmt::Debug + Send + Sync {
    /// Returns `true` if the fence has already signaled.
    fn is_signaled(&self) -> bool;

    /// Returns the host time at which the fence signaled, if it has signaled
    /// and the platform reports a timestamp.
    fn signal_time(&self) -> Option<HostTime> {
        None
    }
}

/// A shared reference to a [`Fence`], or the already-signaled sentinel.
#[derive(Clone, Default)]
pub struct FenceHandle(Option<Arc<dyn Fence>>);

impl FenceHandle {
    /// A fence that is already signaled. Waiting on it is a no-op.
    pub const NO_FENCE: Self = Self(None);

    /// Wraps a platform fence.
    #[must_use]
    pub fn new(fence: Arc<dyn Fence>) -> Self {
        Self(Some(fence))
    }

    /// Returns `true` if this handle refers to an actual fence rather than
    /// [`NO_FENCE`](Self::NO_FENCE).
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Returns `true` if the fence has signaled. [`NO_FENCE`](Self::NO_FENCE)
    /// is always signaled.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.0.as_ref().is_none_or(|f| f.is_signaled())
    }

    /// Returns the signal time reported by the underlying fence.
    #[must_use]
    pub fn signal_time(&self) -> Option<HostTime> {
        self.0.as_ref().and_then(|f| f.signal_time())
    }

    /// Combines two fences into one that signals once both have signaled.
    ///
    /// Merging with [`NO_FENCE`](Self::NO_FENCE) returns the other handle
    /// unchanged, so no wrapper is allocated on the common path.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        match (a.is_valid(), b.is_valid()) {
            (false, _) => b.clone(),
            (_, false) => a.clone(),
            (true, true) => Self::new(Arc::new(MergedFence {
                first: a.clone(),
                second: b.clone(),
            })),
        }
    }

    /// Returns `true` if both handles refer to the same underlying fence.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("FenceHandle(NO_FENCE)"),
            Some(fence) => f.debug_tuple("FenceHandle").field(fence).finish(),
        }
    }
}

/// The union of two fences.
#[derive(Debug)]
struct MergedFence {
    first: FenceHandle,
    second: FenceHandle,
}

impl Fence for MergedFence {
    fn is_signaled(&self) -> bool {
        self.first.is_signaled() && self.second.is_signaled()
    }

    fn signal_time(&self) -> Option<HostTime> {
        if !self.is_signaled() {
            return None;
        }
        match (self.first.signal_time(), self.second.signal_time()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}
