//! Resource model primitives for Stratus (Layer 1).
//!
//! `stratus_resource` defines the declarative vocabulary the rest of the
//! stack is built from: what a desired resource looks like, how one
//! resource's properties may refer to another resource's outputs, and how
//! resolved identifiers are collected for consumers.
//!
//! # Core Concepts
//!
//! - [`ResourceKind`] - Closed set of provisionable resource kinds
//! - [`ResourceDescriptor`] - Immutable definition of one desired resource
//! - [`Value`] - A literal property value or a deferred cross-resource reference
//! - [`Resolution`] - Outcome of resolving a value against captured outputs
//! - [`OutputSet`] - Resolved identifiers exported at the end of a run
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Stratus architecture:
//!
//! - **Layer 1** (`stratus_resource`): resource model primitives (this crate)
//! - **Layer 2** (`stratus_graph`): dependency graph construction
//! - **Layer 3** (`stratus_engine`): convergence execution
//! - **Layer 4** (`stratus_stack`): concrete resource stacks

/// Resource descriptors and property bags.
pub mod descriptor;

/// The closed set of resource kinds.
pub mod kind;

/// Exported output sets.
pub mod output;

/// Property values and deferred reference resolution.
pub mod value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::descriptor::{Properties, ResolvedProperties, ResourceDescriptor};
    pub use crate::kind::ResourceKind;
    pub use crate::output::OutputSet;
    pub use crate::value::{OutputLookup, Resolution, Value};
}

pub use descriptor::{Properties, ResolvedProperties, ResourceDescriptor};
pub use kind::ResourceKind;
pub use output::OutputSet;
pub use value::{OutputLookup, Resolution, Value};
