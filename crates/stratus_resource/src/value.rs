//! Property values and deferred reference resolution.
//!
//! A [`Value`] is either a literal or a reference to an attribute of
//! another resource's outputs. References stay symbolic until the
//! referenced resource has materialized; resolving one before that yields
//! [`Resolution::Unresolved`], which callers must treat as "not ready
//! yet", never as a failure.

use serde::{Deserialize, Serialize};

/// A property value in a resource definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// A concrete JSON value known at definition time.
    Literal(serde_json::Value),
    /// A deferred reference to an output attribute of another resource.
    Ref {
        /// Logical name of the referenced resource.
        resource: String,
        /// Output attribute to read once the resource has materialized
        /// (e.g. `"name"`, `"id"`, `"writer_identity"`).
        attribute: String,
    },
}

impl Value {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Value::Literal(value.into())
    }

    /// Creates a deferred reference to `resource`'s output `attribute`.
    #[must_use]
    pub fn reference(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::Ref {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Returns the logical name this value refers to, if it is a reference.
    #[must_use]
    pub fn referenced_resource(&self) -> Option<&str> {
        match self {
            Value::Literal(_) => None,
            Value::Ref { resource, .. } => Some(resource),
        }
    }

    /// Resolves this value against captured outputs.
    ///
    /// Literals resolve immediately. A reference resolves only once the
    /// lookup can produce the referenced attribute; otherwise the
    /// reference is reported back as [`Resolution::Unresolved`].
    #[must_use]
    pub fn resolve(&self, outputs: &dyn OutputLookup) -> Resolution {
        match self {
            Value::Literal(value) => Resolution::Resolved(value.clone()),
            Value::Ref {
                resource,
                attribute,
            } => match outputs.output(resource, attribute) {
                Some(value) => Resolution::Resolved(value.clone()),
                None => Resolution::Unresolved {
                    resource: resource.clone(),
                    attribute: attribute.clone(),
                },
            },
        }
    }
}

/// Outcome of resolving a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The value is concrete.
    Resolved(serde_json::Value),
    /// The referenced resource has not materialized the attribute yet.
    ///
    /// This is data, not an error: the caller is expected to wait for the
    /// referenced resource rather than fail.
    Unresolved {
        /// Logical name of the referenced resource.
        resource: String,
        /// The attribute that could not be read.
        attribute: String,
    },
}

impl Resolution {
    /// Returns the concrete value, if resolved.
    #[must_use]
    pub fn resolved(self) -> Option<serde_json::Value> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Unresolved { .. } => None,
        }
    }
}

/// Read access to the output attributes of materialized resources.
///
/// Implemented by the execution engine over its captured outputs; tests
/// can implement it over a plain map.
pub trait OutputLookup {
    /// Returns `resource`'s output `attribute`, if the resource has
    /// materialized and produced that attribute.
    fn output(&self, resource: &str, attribute: &str) -> Option<&serde_json::Value>;
}

impl OutputLookup for std::collections::HashMap<(String, String), serde_json::Value> {
    fn output(&self, resource: &str, attribute: &str) -> Option<&serde_json::Value> {
        self.get(&(resource.to_string(), attribute.to_string()))
    }
}
