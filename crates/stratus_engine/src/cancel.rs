//! Cooperative cancellation of a running convergence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag for a convergence run.
///
/// Cancellation is cooperative: once triggered, the executor issues no
/// new provider calls, but lets in-flight calls finish so that created
/// resources are still recorded. Clones share the same flag.
///
/// # Example
///
/// ```
/// use stratus_engine::CancelHandle;
///
/// let cancel = CancelHandle::new();
/// let shared = cancel.clone();
/// shared.cancel();
/// assert!(cancel.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this handle.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once any clone has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
