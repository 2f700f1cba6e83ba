//! Provider capability boundary for Stratus.
//!
//! The convergence engine never talks to a live cloud API. Everything it
//! needs from the outside world is expressed as the [`ResourceProvider`]
//! trait: apply a desired resource definition, or look an existing
//! resource up by natural key. Concrete cloud bindings implement the
//! trait; [`MemoryProvider`] is a deterministic in-memory implementation
//! used throughout the test suites.
//!
//! # For Provider Authors
//!
//! `apply` must be idempotent per resource kind:
//!
//! - **Create-or-adopt kinds** (topics, subscriptions, buckets,
//!   notifications, sinks): applying an identical definition over an
//!   existing resource adopts it and returns its outputs; a divergent
//!   definition fails with [`ApplyError::ConfigurationDrift`].
//! - **Membership grant kinds** (IAM members): the operation is
//!   set-additive — re-granting an existing (target, role, member)
//!   triple is a no-op success, never an error.

/// Error taxonomy for provider operations.
pub mod error;

/// In-memory provider implementation.
pub mod memory;

/// The provider trait and output attribute bags.
pub mod provider;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::ApplyError;
    pub use crate::memory::MemoryProvider;
    pub use crate::provider::{ResourceOutputs, ResourceProvider};
}

pub use error::ApplyError;
pub use memory::MemoryProvider;
pub use provider::{ResourceOutputs, ResourceProvider};
