//! Exported output sets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Resolved identifiers collected at the end of a run, keyed by export
/// name (e.g. `"subscriptionId"`).
///
/// An output set is populated once from materialized resources and then
/// treated as immutable by consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSet {
    values: IndexMap<String, serde_json::Value>,
}

impl OutputSet {
    /// Creates an empty output set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an exported value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Returns the value exported under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Iterates over exports in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of exported values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order() {
        let mut outputs = OutputSet::new();
        outputs.insert("subscriptionId", json!("sub-1"));
        outputs.insert("bucketId", json!("bucket-1"));

        let keys: Vec<&str> = outputs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["subscriptionId", "bucketId"]);
        assert_eq!(outputs.get("bucketId"), Some(&json!("bucket-1")));
    }
}
