//! Resource descriptors and property bags.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::kind::ResourceKind;
use crate::value::Value;

/// Property bag of a descriptor. Insertion order is preserved so that
/// drift comparison and logging stay deterministic.
pub type Properties = IndexMap<String, Value>;

/// Fully resolved properties handed to a provider: every deferred
/// reference has been replaced by a concrete JSON value.
pub type ResolvedProperties = IndexMap<String, serde_json::Value>;

/// Immutable definition of one desired resource.
///
/// A descriptor carries the resource's kind, its unique logical name, a
/// property bag (possibly containing deferred references, see
/// [`Value::Ref`]), and the set of resources it must wait on beyond those
/// implied by its references.
///
/// # Example
///
/// ```
/// use stratus_resource::{ResourceDescriptor, ResourceKind, Value};
///
/// let sub = ResourceDescriptor::new(ResourceKind::Subscription, "notification-sub")
///     .property("topic", Value::reference("notification-topic", "name"))
///     .property("ack_deadline_seconds", Value::literal(60))
///     .depends_on("dead-letter-topic");
///
/// assert_eq!(sub.name(), "notification-sub");
/// assert!(sub.referenced_resources().contains("notification-topic"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    name: String,
    kind: ResourceKind,
    properties: Properties,
    depends_on: BTreeSet<String>,
}

impl ResourceDescriptor {
    /// Creates a descriptor with an empty property bag.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: Properties::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Adds a property, replacing any previous value under the same key.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Adds an explicit execution dependency on another resource.
    ///
    /// References in the property bag already order this resource after
    /// their targets; `depends_on` is for ordering constraints that carry
    /// no data (e.g. "the notification must wait for the publish grant").
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.insert(name.into());
        self
    }

    /// Returns the unique logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the property bag.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the explicit dependency set.
    #[must_use]
    pub fn explicit_dependencies(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Returns the logical names referenced by any [`Value::Ref`] in the
    /// property bag — the implicit dependency set.
    #[must_use]
    pub fn referenced_resources(&self) -> BTreeSet<&str> {
        self.properties
            .values()
            .filter_map(Value::referenced_resource)
            .collect()
    }

    /// Returns the union of explicit and reference-implied dependencies.
    #[must_use]
    pub fn all_dependencies(&self) -> BTreeSet<&str> {
        let mut deps: BTreeSet<&str> = self.depends_on.iter().map(String::as_str).collect();
        deps.extend(self.referenced_resources());
        deps
    }
}
