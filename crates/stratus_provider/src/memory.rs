//! In-memory provider implementation.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;

use async_trait::async_trait;
use stratus_resource::{ResolvedProperties, ResourceKind};

use crate::error::ApplyError;
use crate::provider::{ResourceOutputs, ResourceProvider};

/// Key for create-or-adopt resources.
type ResourceKey = (ResourceKind, String);

/// Key for set-additive grants: (kind, target resource, role, member).
type GrantKey = (ResourceKind, String, String, String);

#[derive(Debug)]
struct StoredResource {
    properties: ResolvedProperties,
    outputs: ResourceOutputs,
}

#[derive(Debug)]
struct FaultPlan {
    remaining: usize,
    error: ApplyError,
}

#[derive(Debug, Default)]
struct Inner {
    resources: IndexMap<ResourceKey, StoredResource>,
    grants: IndexMap<GrantKey, ResourceOutputs>,
    faults: HashMap<String, FaultPlan>,
    creating_calls: HashMap<String, usize>,
    apply_calls: HashMap<String, usize>,
}

/// A deterministic, fully in-memory [`ResourceProvider`].
///
/// Implements the per-kind idempotency contract exactly: create-or-adopt
/// for resource kinds, set-additive no-op re-grants for membership kinds.
/// Faults can be injected per logical name to exercise the engine's retry
/// and failure paths, and per-name call counters are exposed so tests can
/// assert how often a resource was actually created.
///
/// # Example
///
/// ```
/// use stratus_provider::{ApplyError, MemoryProvider};
///
/// let provider = MemoryProvider::new();
/// provider.fail_next("audit-log-sink", 2, ApplyError::transient("quota"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` applies for `name` fail with clones of
    /// `error`.
    pub fn fail_next(&self, name: impl Into<String>, count: usize, error: ApplyError) {
        self.inner.lock().faults.insert(
            name.into(),
            FaultPlan {
                remaining: count,
                error,
            },
        );
    }

    /// Returns how many applies for `name` actually created state, as
    /// opposed to adopting or re-granting.
    #[must_use]
    pub fn creating_calls(&self, name: &str) -> usize {
        self.inner.lock().creating_calls.get(name).copied().unwrap_or(0)
    }

    /// Returns how many times `apply` was invoked for `name`, including
    /// failed and adopted calls.
    #[must_use]
    pub fn apply_calls(&self, name: &str) -> usize {
        self.inner.lock().apply_calls.get(name).copied().unwrap_or(0)
    }

    /// Returns `true` if a create-or-adopt resource exists.
    #[must_use]
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.inner
            .lock()
            .resources
            .contains_key(&(kind, name.to_string()))
    }

    /// Returns the number of distinct grants held.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.inner.lock().grants.len()
    }

    /// Extracts the grant key fields (target, role, member) from resolved
    /// properties.
    fn grant_key(
        kind: ResourceKind,
        name: &str,
        properties: &ResolvedProperties,
    ) -> Result<GrantKey, ApplyError> {
        let target_property = match kind {
            ResourceKind::TopicIamMember => "topic",
            ResourceKind::SubscriptionIamMember => "subscription",
            ResourceKind::BucketIamMember => "bucket",
            _ => {
                return Err(ApplyError::InvalidArgument(format!(
                    "resource '{name}' of kind {kind} is not a membership grant"
                )));
            }
        };
        let field = |key: &str| -> Result<String, ApplyError> {
            properties
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ApplyError::InvalidArgument(format!(
                        "grant '{name}' is missing string property '{key}'"
                    ))
                })
        };
        Ok((kind, field(target_property)?, field("role")?, field("member")?))
    }

    /// Synthesizes output attributes for a newly created resource.
    fn synthesize_outputs(
        kind: ResourceKind,
        name: &str,
        properties: &ResolvedProperties,
    ) -> ResourceOutputs {
        let natural_name = properties
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(name)
            .to_string();

        let mut outputs = ResourceOutputs::new();
        outputs.insert("name", serde_json::Value::String(natural_name.clone()));
        outputs.insert(
            "id",
            serde_json::Value::String(format!("{}/{natural_name}", kind.as_str())),
        );
        if kind == ResourceKind::LogSink {
            outputs.insert(
                "writer_identity",
                serde_json::Value::String(format!(
                    "serviceAccount:{natural_name}@logging-sink.example.iam"
                )),
            );
        }
        outputs
    }

    /// Describes the first property that differs between the stored and
    /// requested configuration.
    fn first_difference(stored: &ResolvedProperties, requested: &ResolvedProperties) -> String {
        for (key, value) in requested {
            match stored.get(key) {
                Some(existing) if existing == value => {}
                Some(existing) => {
                    return format!("property '{key}' is {existing}, requested {value}");
                }
                None => return format!("property '{key}' was not previously set"),
            }
        }
        for key in stored.keys() {
            if !requested.contains_key(key) {
                return format!("property '{key}' was previously set");
            }
        }
        "configurations differ".to_string()
    }
}

#[async_trait]
impl ResourceProvider for MemoryProvider {
    async fn apply(
        &self,
        kind: ResourceKind,
        name: &str,
        properties: &ResolvedProperties,
    ) -> Result<ResourceOutputs, ApplyError> {
        let mut inner = self.inner.lock();
        *inner.apply_calls.entry(name.to_string()).or_insert(0) += 1;

        if let Some(plan) = inner.faults.get_mut(name) {
            if plan.remaining > 0 {
                plan.remaining -= 1;
                return Err(plan.error.clone());
            }
        }

        if kind.is_membership_grant() {
            let key = Self::grant_key(kind, name, properties)?;
            if let Some(outputs) = inner.grants.get(&key) {
                // Re-granting an existing membership is a no-op success.
                return Ok(outputs.clone());
            }
            let outputs = Self::synthesize_outputs(kind, name, properties);
            inner.grants.insert(key, outputs.clone());
            *inner.creating_calls.entry(name.to_string()).or_insert(0) += 1;
            return Ok(outputs);
        }

        let key = (kind, name.to_string());
        if let Some(stored) = inner.resources.get(&key) {
            if stored.properties == *properties {
                // Adoption: identical definition, no second create.
                return Ok(stored.outputs.clone());
            }
            return Err(ApplyError::ConfigurationDrift {
                kind,
                name: name.to_string(),
                detail: Self::first_difference(&stored.properties, properties),
            });
        }

        let outputs = Self::synthesize_outputs(kind, name, properties);
        inner.resources.insert(
            key,
            StoredResource {
                properties: properties.clone(),
                outputs: outputs.clone(),
            },
        );
        *inner.creating_calls.entry(name.to_string()).or_insert(0) += 1;
        Ok(outputs)
    }

    async fn lookup(
        &self,
        kind: ResourceKind,
        natural_key: &str,
    ) -> Result<Option<ResourceOutputs>, ApplyError> {
        let inner = self.inner.lock();
        let found = inner
            .resources
            .iter()
            .find(|((stored_kind, _), stored)| {
                *stored_kind == kind
                    && stored.outputs.get("name").and_then(serde_json::Value::as_str)
                        == Some(natural_key)
            })
            .map(|(_, stored)| stored.outputs.clone());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties(pairs: &[(&str, serde_json::Value)]) -> ResolvedProperties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn identical_reapply_adopts_without_second_create() {
        let provider = MemoryProvider::new();
        let props = properties(&[("location", json!("US"))]);

        let first = provider
            .apply(ResourceKind::Bucket, "log-bucket", &props)
            .await
            .expect("create");
        let second = provider
            .apply(ResourceKind::Bucket, "log-bucket", &props)
            .await
            .expect("adopt");

        assert_eq!(first, second);
        assert_eq!(provider.creating_calls("log-bucket"), 1);
        assert_eq!(provider.apply_calls("log-bucket"), 2);
    }

    #[tokio::test]
    async fn divergent_reapply_is_configuration_drift() {
        let provider = MemoryProvider::new();
        provider
            .apply(
                ResourceKind::Bucket,
                "log-bucket",
                &properties(&[("location", json!("US"))]),
            )
            .await
            .expect("create");

        let err = provider
            .apply(
                ResourceKind::Bucket,
                "log-bucket",
                &properties(&[("location", json!("EU"))]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::ConfigurationDrift { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn regrant_is_a_noop_success() {
        let provider = MemoryProvider::new();
        let props = properties(&[
            ("topic", json!("notification-topic")),
            ("role", json!("roles/pubsub.publisher")),
            ("member", json!("serviceAccount:gcs@example.iam")),
        ]);

        provider
            .apply(ResourceKind::TopicIamMember, "topic-publisher", &props)
            .await
            .expect("grant");
        provider
            .apply(ResourceKind::TopicIamMember, "topic-publisher", &props)
            .await
            .expect("re-grant");

        assert_eq!(provider.grant_count(), 1);
        assert_eq!(provider.creating_calls("topic-publisher"), 1);
    }

    #[test]
    fn grant_key_rejects_non_grant_kinds() {
        let err =
            MemoryProvider::grant_key(ResourceKind::Topic, "topic", &properties(&[])).unwrap_err();
        assert!(matches!(err, ApplyError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn grant_missing_member_is_invalid_argument() {
        let provider = MemoryProvider::new();
        let err = provider
            .apply(
                ResourceKind::BucketIamMember,
                "bad-grant",
                &properties(&[("bucket", json!("log-bucket"))]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn injected_faults_fail_then_clear() {
        let provider = MemoryProvider::new();
        provider.fail_next("topic", 2, ApplyError::transient("rate limited"));
        let props = properties(&[]);

        for _ in 0..2 {
            let err = provider
                .apply(ResourceKind::Topic, "topic", &props)
                .await
                .unwrap_err();
            assert!(err.is_transient());
        }
        provider
            .apply(ResourceKind::Topic, "topic", &props)
            .await
            .expect("third attempt succeeds");
        assert_eq!(provider.apply_calls("topic"), 3);
        assert_eq!(provider.creating_calls("topic"), 1);
    }

    #[tokio::test]
    async fn sink_outputs_include_writer_identity() {
        let provider = MemoryProvider::new();
        let outputs = provider
            .apply(ResourceKind::LogSink, "audit-log-sink", &properties(&[]))
            .await
            .expect("create");
        let identity = outputs
            .get("writer_identity")
            .and_then(serde_json::Value::as_str)
            .expect("writer identity");
        assert!(identity.starts_with("serviceAccount:"));
    }

    #[tokio::test]
    async fn lookup_finds_resources_by_natural_name() {
        let provider = MemoryProvider::new();
        provider
            .apply(
                ResourceKind::Topic,
                "notification-topic",
                &properties(&[("name", json!("bucket-notification-topic"))]),
            )
            .await
            .expect("create");

        let found = provider
            .lookup(ResourceKind::Topic, "bucket-notification-topic")
            .await
            .expect("lookup");
        assert!(found.is_some());
        let missing = provider
            .lookup(ResourceKind::Topic, "absent-topic")
            .await
            .expect("lookup");
        assert!(missing.is_none());
    }
}
