//! The provider trait and output attribute bags.

use async_trait::async_trait;
use indexmap::IndexMap;

use stratus_resource::{ResolvedProperties, ResourceKind};

use crate::error::ApplyError;

/// Output attributes captured from a materialized resource.
///
/// Keys are attribute names addressable from deferred references
/// (`"name"`, `"id"`, `"writer_identity"`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceOutputs {
    attributes: IndexMap<String, serde_json::Value>,
}

impl ResourceOutputs {
    /// Creates an empty attribute bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an output attribute.
    pub fn insert(&mut self, attribute: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(attribute.into(), value);
    }

    /// Returns the attribute value, if present.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&serde_json::Value> {
        self.attributes.get(attribute)
    }

    /// Iterates over attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, serde_json::Value)> for ResourceOutputs {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// Capability for creating, adopting, and inspecting remote resources.
///
/// Implementations must be safe for concurrent use: the engine applies
/// independent resources in parallel. See the crate docs for the
/// per-kind idempotency contract `apply` must uphold.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Drives one resource to its desired configuration and returns its
    /// output attributes.
    ///
    /// `properties` contains no deferred references; the engine resolves
    /// them before calling.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Transient`] for retryable failures and one
    /// of the fatal variants otherwise.
    async fn apply(
        &self,
        kind: ResourceKind,
        name: &str,
        properties: &ResolvedProperties,
    ) -> Result<ResourceOutputs, ApplyError>;

    /// Looks up an existing resource by natural key.
    ///
    /// Returns `Ok(None)` if no resource of `kind` with that key exists.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the lookup itself fails.
    async fn lookup(
        &self,
        kind: ResourceKind,
        natural_key: &str,
    ) -> Result<Option<ResourceOutputs>, ApplyError>;
}
