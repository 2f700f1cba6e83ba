//! # Stratus Internal Library
//!
//! Re-exports the core Stratus crates for convenience.

/// Layer 1: resource model primitives.
pub use stratus_resource;

/// Layer 2: dependency graph construction.
pub use stratus_graph;

/// Layer 3: convergence execution.
pub use stratus_engine;

/// Provider capability boundary and in-memory implementation.
pub use stratus_provider;

/// Layer 4: the bucket-notification stack.
pub use stratus_stack;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_engine::prelude::*;
    pub use stratus_graph::prelude::*;
    pub use stratus_provider::prelude::*;
    pub use stratus_resource::prelude::*;
    pub use stratus_stack::{StackConfig, build_graph, export_list};
}
