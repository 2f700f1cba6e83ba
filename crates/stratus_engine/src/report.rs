//! Run reports and output export.

use core::fmt;
use core::time::Duration;

use indexmap::IndexMap;

use stratus_provider::ResourceOutputs;
use stratus_resource::OutputSet;

/// Final state of one resource after a convergence run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Never started; only occurs when the run was cancelled.
    Pending,
    /// The provider call succeeded and outputs were captured.
    Materialized,
    /// The provider call failed fatally (or transient retries were
    /// exhausted).
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// Never attempted because an upstream dependency failed.
    Skipped {
        /// The failed resource this one transitively depends on.
        failed_dependency: String,
    },
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::Pending => write!(f, "pending"),
            ResourceStatus::Materialized => write!(f, "materialized"),
            ResourceStatus::Failed { reason } => write!(f, "failed: {reason}"),
            ResourceStatus::Skipped { failed_dependency } => {
                write!(f, "skipped: upstream failure of '{failed_dependency}'")
            }
        }
    }
}

/// One entry of the export surface: copy `resource`'s output `attribute`
/// into the output set under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    /// Export key visible to consumers (e.g. `"subscriptionId"`).
    pub key: String,
    /// Logical name of the exporting resource.
    pub resource: String,
    /// Output attribute to export.
    pub attribute: String,
}

impl ExportSpec {
    /// Creates an export entry.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        resource: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }
}

/// Error producing the export surface.
///
/// Exports are expected to be wired only to resources the graph's own
/// dependency structure guarantees ready, so every variant here is a
/// programming error in the caller's export list, not a recoverable
/// runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The export names a resource that is not in the report.
    #[error("export '{key}' names unknown resource '{resource}'")]
    UnknownResource {
        /// The export key.
        key: String,
        /// The unknown resource name.
        resource: String,
    },

    /// The export names a resource that did not materialize.
    #[error("export '{key}' targets resource '{resource}' which is {status}")]
    NotMaterialized {
        /// The export key.
        key: String,
        /// The resource name.
        resource: String,
        /// The resource's actual status.
        status: String,
    },

    /// The resource materialized but produced no such attribute.
    #[error("export '{key}': resource '{resource}' has no output attribute '{attribute}'")]
    MissingAttribute {
        /// The export key.
        key: String,
        /// The resource name.
        resource: String,
        /// The missing attribute.
        attribute: String,
    },
}

/// Outcome of a convergence run.
///
/// Holds the final status of every resource in the graph, the output
/// attributes captured from materialized resources, and run timing.
#[derive(Debug)]
pub struct ConvergenceReport {
    statuses: IndexMap<String, ResourceStatus>,
    outputs: IndexMap<String, ResourceOutputs>,
    duration: Duration,
}

impl ConvergenceReport {
    pub(crate) fn new(
        statuses: IndexMap<String, ResourceStatus>,
        outputs: IndexMap<String, ResourceOutputs>,
        duration: Duration,
    ) -> Self {
        Self {
            statuses,
            outputs,
            duration,
        }
    }

    /// Returns `true` only if every resource materialized.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.statuses
            .values()
            .all(|status| *status == ResourceStatus::Materialized)
    }

    /// Returns the final status of a resource.
    #[must_use]
    pub fn status(&self, resource: &str) -> Option<&ResourceStatus> {
        self.statuses.get(resource)
    }

    /// Iterates over (resource, status) pairs in graph order.
    pub fn statuses(&self) -> impl Iterator<Item = (&str, &ResourceStatus)> {
        self.statuses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the captured outputs of a materialized resource.
    #[must_use]
    pub fn outputs(&self, resource: &str) -> Option<&ResourceOutputs> {
        self.outputs.get(resource)
    }

    /// Returns how long the run took.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the number of materialized resources.
    #[must_use]
    pub fn materialized_count(&self) -> usize {
        self.count(|s| matches!(s, ResourceStatus::Materialized))
    }

    /// Returns the number of failed resources.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ResourceStatus::Failed { .. }))
    }

    /// Returns the number of resources skipped due to upstream failures.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ResourceStatus::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&ResourceStatus) -> bool) -> usize {
        self.statuses.values().filter(|s| predicate(s)).count()
    }

    /// Copies the requested attributes of materialized resources into an
    /// [`OutputSet`].
    ///
    /// # Errors
    ///
    /// Returns an [`ExportError`] if an entry names an unknown resource,
    /// a resource that did not materialize, or an attribute the resource
    /// did not produce. All variants indicate a miswired export list.
    pub fn export(&self, exports: &[ExportSpec]) -> Result<OutputSet, ExportError> {
        let mut set = OutputSet::new();
        for spec in exports {
            let status =
                self.status(&spec.resource)
                    .ok_or_else(|| ExportError::UnknownResource {
                        key: spec.key.clone(),
                        resource: spec.resource.clone(),
                    })?;
            if *status != ResourceStatus::Materialized {
                return Err(ExportError::NotMaterialized {
                    key: spec.key.clone(),
                    resource: spec.resource.clone(),
                    status: status.to_string(),
                });
            }
            let value = self
                .outputs
                .get(&spec.resource)
                .and_then(|outputs| outputs.get(&spec.attribute))
                .ok_or_else(|| ExportError::MissingAttribute {
                    key: spec.key.clone(),
                    resource: spec.resource.clone(),
                    attribute: spec.attribute.clone(),
                })?;
            set.insert(spec.key.clone(), value.clone());
        }
        Ok(set)
    }
}
