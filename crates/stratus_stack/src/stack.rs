//! Stack declaration: descriptors, names, and exports.

use serde_json::json;

use stratus_engine::ExportSpec;
use stratus_graph::{GraphError, ResourceGraph};
use stratus_resource::{ResourceDescriptor, ResourceKind, Value};

use crate::config::StackConfig;

/// Logical names of the stack's resources.
pub mod names {
    /// Dead-letter topic for undeliverable notification events.
    pub const DEAD_LETTER_TOPIC: &str = "dead-letter-topic";
    /// Publish grant on the dead-letter topic for the message service.
    pub const DEAD_LETTER_TOPIC_PUBLISHER: &str = "dead-letter-topic-publisher";
    /// Subscription draining the dead-letter topic.
    pub const DEAD_LETTER_SUB: &str = "dead-letter-sub";
    /// Topic receiving bucket event notifications.
    pub const NOTIFICATION_TOPIC: &str = "notification-topic";
    /// Primary subscription on the notification topic.
    pub const NOTIFICATION_SUB: &str = "notification-sub";
    /// Subscribe grant on the primary subscription for the message
    /// service (dead-letter forwarding).
    pub const NOTIFICATION_SUB_SUBSCRIBER: &str = "notification-sub-subscriber";
    /// Publish grant on the notification topic for the storage service.
    pub const NOTIFICATION_TOPIC_PUBLISHER: &str = "notification-topic-publisher";
    /// Bucket collecting exported logs.
    pub const LOG_BUCKET: &str = "log-bucket";
    /// Bucket-event-to-topic notification wiring.
    pub const BUCKET_NOTIFICATION: &str = "bucket-notification";
    /// Audit-log sink writing into the bucket.
    pub const AUDIT_LOG_SINK: &str = "audit-log-sink";
    /// Write grant on the bucket for the sink's writer identity.
    pub const SINK_WRITER_BUCKET_MEMBER: &str = "sink-writer-bucket-member";
    /// Conditional: administrative grant on the bucket for the consumer.
    pub const CONSUMER_BUCKET_MEMBER: &str = "consumer-bucket-member";
    /// Conditional: subscribe grant on the subscription for the consumer.
    pub const CONSUMER_SUB_MEMBER: &str = "consumer-sub-member";
}

// Hand-tuned engine defaults, deliberately not exposed as inputs.
const ACK_DEADLINE_SECONDS: i64 = 60;
const MAX_DELIVERY_ATTEMPTS: i64 = 5;
const EVENT_TYPES: [&str; 1] = ["OBJECT_FINALIZE"];
const PAYLOAD_FORMAT: &str = "JSON_API_V1";
const BUCKET_LOCATION: &str = "US";
const AUDIT_LOG_FILTER: &str = concat!(
    r#"LOG_ID("cloudaudit.googleapis.com/activity") OR "#,
    r#"LOG_ID("externalaudit.googleapis.com/activity") OR "#,
    r#"LOG_ID("cloudaudit.googleapis.com/system_event") OR "#,
    r#"LOG_ID("externalaudit.googleapis.com/system_event") OR "#,
    r#"LOG_ID("cloudaudit.googleapis.com/access_transparency") OR "#,
    r#"LOG_ID("externalaudit.googleapis.com/access_transparency")"#,
);

const ROLE_PUBLISHER: &str = "roles/pubsub.publisher";
const ROLE_SUBSCRIBER: &str = "roles/pubsub.subscriber";
const ROLE_OBJECT_CREATOR: &str = "roles/storage.objectCreator";
const ROLE_OBJECT_ADMIN: &str = "roles/storage.objectAdmin";

/// Declares the full descriptor set for the bucket-notification stack.
///
/// The consumer grant pair is appended only when the configuration names
/// a non-empty consumer service account; the decision is made here, once,
/// so the graph handed to the engine is static for the whole run.
#[must_use]
pub fn bucket_notification_stack(config: &StackConfig) -> Vec<ResourceDescriptor> {
    let pubsub_principal = config.pubsub_principal();

    let mut descriptors = vec![
        ResourceDescriptor::new(ResourceKind::Topic, names::DEAD_LETTER_TOPIC)
            .property("name", Value::literal("bucket-notification-dl-topic")),
        ResourceDescriptor::new(ResourceKind::TopicIamMember, names::DEAD_LETTER_TOPIC_PUBLISHER)
            .property("topic", Value::reference(names::DEAD_LETTER_TOPIC, "name"))
            .property("role", Value::literal(ROLE_PUBLISHER))
            .property("member", Value::literal(pubsub_principal.clone())),
        ResourceDescriptor::new(ResourceKind::Subscription, names::DEAD_LETTER_SUB)
            .property("topic", Value::reference(names::DEAD_LETTER_TOPIC, "name"))
            .property("ack_deadline_seconds", Value::literal(ACK_DEADLINE_SECONDS)),
        ResourceDescriptor::new(ResourceKind::Topic, names::NOTIFICATION_TOPIC)
            .property("name", Value::literal("bucket-notification-topic")),
        ResourceDescriptor::new(ResourceKind::Subscription, names::NOTIFICATION_SUB)
            .property("topic", Value::reference(names::NOTIFICATION_TOPIC, "name"))
            .property("ack_deadline_seconds", Value::literal(ACK_DEADLINE_SECONDS))
            .property(
                "dead_letter_topic",
                Value::reference(names::DEAD_LETTER_TOPIC, "id"),
            )
            .property("max_delivery_attempts", Value::literal(MAX_DELIVERY_ATTEMPTS)),
        ResourceDescriptor::new(
            ResourceKind::SubscriptionIamMember,
            names::NOTIFICATION_SUB_SUBSCRIBER,
        )
        .property("subscription", Value::reference(names::NOTIFICATION_SUB, "name"))
        .property("role", Value::literal(ROLE_SUBSCRIBER))
        .property("member", Value::literal(pubsub_principal)),
        ResourceDescriptor::new(
            ResourceKind::TopicIamMember,
            names::NOTIFICATION_TOPIC_PUBLISHER,
        )
        .property("topic", Value::reference(names::NOTIFICATION_TOPIC, "name"))
        .property("role", Value::literal(ROLE_PUBLISHER))
        .property("member", Value::literal(config.storage_principal())),
        ResourceDescriptor::new(ResourceKind::Bucket, names::LOG_BUCKET)
            .property("location", Value::literal(BUCKET_LOCATION)),
        // The notification must not exist before the storage service may
        // publish to the topic, hence the explicit dependency on the
        // publish grant (which carries no data the notification needs).
        ResourceDescriptor::new(ResourceKind::BucketNotification, names::BUCKET_NOTIFICATION)
            .property("bucket", Value::reference(names::LOG_BUCKET, "name"))
            .property("topic", Value::reference(names::NOTIFICATION_TOPIC, "name"))
            .property("event_types", Value::literal(json!(EVENT_TYPES)))
            .property("payload_format", Value::literal(PAYLOAD_FORMAT))
            .depends_on(names::NOTIFICATION_TOPIC_PUBLISHER),
        // The sink destination is the bucket itself; the provider binding
        // renders the storage URL from the bucket name.
        ResourceDescriptor::new(ResourceKind::LogSink, names::AUDIT_LOG_SINK)
            .property("destination_bucket", Value::reference(names::LOG_BUCKET, "name"))
            .property("filter", Value::literal(AUDIT_LOG_FILTER)),
        ResourceDescriptor::new(ResourceKind::BucketIamMember, names::SINK_WRITER_BUCKET_MEMBER)
            .property("bucket", Value::reference(names::LOG_BUCKET, "name"))
            .property("role", Value::literal(ROLE_OBJECT_CREATOR))
            .property(
                "member",
                Value::reference(names::AUDIT_LOG_SINK, "writer_identity"),
            ),
    ];

    if let Some(consumer_principal) = config.consumer_principal() {
        descriptors.push(
            ResourceDescriptor::new(ResourceKind::BucketIamMember, names::CONSUMER_BUCKET_MEMBER)
                .property("bucket", Value::reference(names::LOG_BUCKET, "name"))
                .property("role", Value::literal(ROLE_OBJECT_ADMIN))
                .property("member", Value::literal(consumer_principal.clone())),
        );
        descriptors.push(
            ResourceDescriptor::new(
                ResourceKind::SubscriptionIamMember,
                names::CONSUMER_SUB_MEMBER,
            )
            .property("subscription", Value::reference(names::NOTIFICATION_SUB, "name"))
            .property("role", Value::literal(ROLE_SUBSCRIBER))
            .property("member", Value::literal(consumer_principal)),
        );
    }

    descriptors
}

/// Builds the validated dependency graph for the stack.
///
/// # Errors
///
/// Returns a [`GraphError`] if the declaration is malformed; with a
/// well-formed [`StackConfig`] this does not happen.
pub fn build_graph(config: &StackConfig) -> Result<ResourceGraph, GraphError> {
    ResourceGraph::build(bucket_notification_stack(config))
}

/// The stack's export surface.
#[must_use]
pub fn export_list() -> Vec<ExportSpec> {
    vec![
        ExportSpec::new("subscriptionId", names::NOTIFICATION_SUB, "id"),
        ExportSpec::new("bucketId", names::LOG_BUCKET, "id"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_engine::{Executor, ResourceStatus, RetryPolicy};
    use stratus_provider::{ApplyError, MemoryProvider};

    fn config(consumer: Option<&str>) -> StackConfig {
        StackConfig {
            project_number: "123456".to_string(),
            storage_service_account: "gcs@example.iam".to_string(),
            consumer_service_account: consumer.map(str::to_string),
        }
    }

    fn executor() -> Executor {
        Executor::new().with_retry_policy(RetryPolicy::without_delay(4))
    }

    #[test]
    fn consumer_grants_are_declared_only_when_configured() {
        let without = bucket_notification_stack(&config(None));
        assert!(!without.iter().any(|d| d.name() == names::CONSUMER_BUCKET_MEMBER));
        assert!(!without.iter().any(|d| d.name() == names::CONSUMER_SUB_MEMBER));

        let with = bucket_notification_stack(&config(Some("consumer@example.iam")));
        assert!(with.iter().any(|d| d.name() == names::CONSUMER_BUCKET_MEMBER));
        assert!(with.iter().any(|d| d.name() == names::CONSUMER_SUB_MEMBER));
        assert_eq!(with.len(), without.len() + 2);
    }

    #[test]
    fn empty_consumer_account_adds_no_grants() {
        let descriptors = bucket_notification_stack(&config(Some("")));
        assert!(!descriptors.iter().any(|d| d.name() == names::CONSUMER_BUCKET_MEMBER));
    }

    #[test]
    fn the_stack_graph_builds() {
        let graph = build_graph(&config(Some("consumer@example.iam"))).expect("graph builds");
        assert_eq!(graph.len(), 13);
    }

    #[tokio::test]
    async fn converges_and_exports_without_a_consumer() {
        let graph = build_graph(&config(None)).expect("graph builds");
        let provider = MemoryProvider::new();
        let report = executor().run(&graph, &provider).await;

        assert!(report.converged());
        assert_eq!(report.materialized_count(), 11);
        assert_eq!(provider.apply_calls(names::CONSUMER_BUCKET_MEMBER), 0);
        assert_eq!(provider.apply_calls(names::CONSUMER_SUB_MEMBER), 0);

        let outputs = report.export(&export_list()).expect("export");
        assert_eq!(
            outputs.get("subscriptionId"),
            report
                .outputs(names::NOTIFICATION_SUB)
                .and_then(|o| o.get("id"))
        );
        assert_eq!(
            outputs.get("bucketId"),
            report.outputs(names::LOG_BUCKET).and_then(|o| o.get("id"))
        );
    }

    #[tokio::test]
    async fn converges_with_consumer_grants_after_their_targets() {
        let graph = build_graph(&config(Some("consumer@example.iam"))).expect("graph builds");
        let provider = MemoryProvider::new();
        let report = executor().run(&graph, &provider).await;

        assert!(report.converged());
        assert_eq!(
            report.status(names::CONSUMER_BUCKET_MEMBER),
            Some(&ResourceStatus::Materialized)
        );
        assert_eq!(
            report.status(names::CONSUMER_SUB_MEMBER),
            Some(&ResourceStatus::Materialized)
        );
        assert_eq!(provider.creating_calls(names::CONSUMER_BUCKET_MEMBER), 1);
        assert_eq!(provider.creating_calls(names::CONSUMER_SUB_MEMBER), 1);
    }

    #[tokio::test]
    async fn rerunning_the_stack_is_idempotent() {
        let graph = build_graph(&config(Some("consumer@example.iam"))).expect("graph builds");
        let provider = MemoryProvider::new();
        let executor = executor();

        assert!(executor.run(&graph, &provider).await.converged());
        assert!(executor.run(&graph, &provider).await.converged());

        for descriptor in graph.descriptors() {
            assert_eq!(
                provider.creating_calls(descriptor.name()),
                1,
                "{} must be created exactly once",
                descriptor.name()
            );
        }
    }

    #[tokio::test]
    async fn sink_survives_two_transient_failures() {
        let graph = build_graph(&config(None)).expect("graph builds");
        let provider = MemoryProvider::new();
        provider.fail_next(names::AUDIT_LOG_SINK, 2, ApplyError::transient("quota"));

        let report = executor().run(&graph, &provider).await;

        assert!(report.converged());
        assert_eq!(
            report.status(names::AUDIT_LOG_SINK),
            Some(&ResourceStatus::Materialized)
        );
        assert_eq!(provider.apply_calls(names::AUDIT_LOG_SINK), 3);
        // The grant fed by the sink's writer identity still materialized.
        assert_eq!(
            report.status(names::SINK_WRITER_BUCKET_MEMBER),
            Some(&ResourceStatus::Materialized)
        );
    }

    #[tokio::test]
    async fn bucket_failure_skips_the_sink_chain_but_not_the_topics() {
        let graph = build_graph(&config(None)).expect("graph builds");
        let provider = MemoryProvider::new();
        provider.fail_next(
            names::LOG_BUCKET,
            1,
            ApplyError::PermissionDenied("denied".to_string()),
        );

        let report = executor().run(&graph, &provider).await;

        assert!(!report.converged());
        assert!(matches!(
            report.status(names::LOG_BUCKET),
            Some(ResourceStatus::Failed { .. })
        ));
        for skipped in [
            names::BUCKET_NOTIFICATION,
            names::AUDIT_LOG_SINK,
            names::SINK_WRITER_BUCKET_MEMBER,
        ] {
            assert!(
                matches!(report.status(skipped), Some(ResourceStatus::Skipped { .. })),
                "{skipped} should be skipped"
            );
            assert_eq!(provider.apply_calls(skipped), 0);
        }
        assert_eq!(
            report.status(names::NOTIFICATION_SUB),
            Some(&ResourceStatus::Materialized)
        );
    }
}
