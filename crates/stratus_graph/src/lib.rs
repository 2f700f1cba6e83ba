//! Dependency graph construction for Stratus (Layer 2).
//!
//! `stratus_graph` turns a flat list of [`ResourceDescriptor`]s into a
//! validated directed acyclic graph. The dependency set of each resource
//! is the union of its explicit `depends_on` entries and the resources
//! named by deferred references in its property bag. Malformed graphs
//! (cycles, references to absent resources) are rejected here, before any
//! provider call is made.
//!
//! # Example
//!
//! ```
//! use stratus_graph::ResourceGraph;
//! use stratus_resource::{ResourceDescriptor, ResourceKind, Value};
//!
//! let graph = ResourceGraph::build(vec![
//!     ResourceDescriptor::new(ResourceKind::Topic, "topic"),
//!     ResourceDescriptor::new(ResourceKind::Subscription, "sub")
//!         .property("topic", Value::reference("topic", "name")),
//! ])?;
//!
//! assert_eq!(graph.topo_order().len(), 2);
//! # Ok::<(), stratus_graph::GraphError>(())
//! ```
//!
//! [`ResourceDescriptor`]: stratus_resource::ResourceDescriptor

/// Graph structure, builder, and validation.
pub mod graph;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::graph::{GraphError, ResourceGraph};
}

pub use graph::{GraphError, ResourceGraph};
