//! The bucket-notification stack (Layer 4).
//!
//! `stratus_stack` declares the concrete resource graph the engine
//! exists to converge: a notification topic with a dead-lettered
//! subscription, a log bucket wired to publish object-finalize events to
//! the topic, an audit-log sink writing into the bucket, and the IAM
//! grants that make the wiring work. An optional consumer service
//! account adds read/administrative grants on the bucket and the
//! subscription.
//!
//! # Example
//!
//! ```
//! use stratus_stack::{StackConfig, build_graph, export_list};
//!
//! let config = StackConfig {
//!     project_number: "123456".to_string(),
//!     storage_service_account: "gcs-project-account@example.iam".to_string(),
//!     consumer_service_account: None,
//! };
//! let graph = build_graph(&config)?;
//! let exports = export_list();
//! # Ok::<(), stratus_graph::GraphError>(())
//! ```

/// External configuration for the stack.
pub mod config;

/// Stack declaration: descriptors, names, and exports.
pub mod stack;

pub use config::StackConfig;
pub use stack::{build_graph, bucket_notification_stack, export_list, names};
