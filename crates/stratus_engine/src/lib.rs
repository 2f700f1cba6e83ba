//! Convergence execution for Stratus (Layer 3).
//!
//! `stratus_engine` walks a validated [`ResourceGraph`] in dependency
//! order and drives a [`ResourceProvider`] until the live state matches
//! the declared one. Independent resources are applied concurrently;
//! transient provider failures are retried with bounded exponential
//! backoff; a fatal failure skips the failed resource's transitive
//! dependents while unrelated subtrees run to completion.
//!
//! # Example
//!
//! ```ignore
//! use stratus_engine::{Executor, ExportSpec};
//!
//! let executor = Executor::new();
//! let report = executor.run(&graph, &provider).await;
//! if report.converged() {
//!     let outputs = report.export(&[
//!         ExportSpec::new("bucketId", "log-bucket", "id"),
//!     ])?;
//! }
//! ```
//!
//! [`ResourceGraph`]: stratus_graph::ResourceGraph
//! [`ResourceProvider`]: stratus_provider::ResourceProvider

/// Cooperative cancellation of a running convergence.
pub mod cancel;

/// The convergence executor and per-node state machine.
pub mod executor;

/// Run reports and output export.
pub mod report;

/// Retry policy for transient provider failures.
pub mod retry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cancel::CancelHandle;
    pub use crate::executor::Executor;
    pub use crate::report::{ConvergenceReport, ExportError, ExportSpec, ResourceStatus};
    pub use crate::retry::RetryPolicy;
}

pub use cancel::CancelHandle;
pub use executor::Executor;
pub use report::{ConvergenceReport, ExportError, ExportSpec, ResourceStatus};
pub use retry::RetryPolicy;
