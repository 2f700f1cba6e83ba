//! A dependency-ordered, idempotent convergence engine for declarative
//! cloud resource graphs.
//!

pub use stratus_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_internal::prelude::*;
}
