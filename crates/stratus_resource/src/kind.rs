//! The closed set of resource kinds Stratus knows how to converge.
//!
//! Kinds fall into two idempotency regimes. Most kinds are
//! *create-or-adopt*: re-applying an identical definition adopts the
//! existing resource, while a divergent definition is configuration drift.
//! IAM membership kinds are *set-additive*: granting the same principal the
//! same role twice is a no-op success.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a provisionable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A message topic.
    Topic,
    /// A pull subscription on a topic.
    Subscription,
    /// An object storage bucket.
    Bucket,
    /// A bucket-event-to-topic notification wiring.
    BucketNotification,
    /// A log-export sink writing into a bucket.
    LogSink,
    /// A role grant to one principal on a topic.
    TopicIamMember,
    /// A role grant to one principal on a subscription.
    SubscriptionIamMember,
    /// A role grant to one principal on a bucket.
    BucketIamMember,
}

impl ResourceKind {
    /// Returns `true` for IAM membership kinds, which are applied
    /// set-additively rather than created-or-adopted.
    #[must_use]
    pub fn is_membership_grant(&self) -> bool {
        matches!(
            self,
            ResourceKind::TopicIamMember
                | ResourceKind::SubscriptionIamMember
                | ResourceKind::BucketIamMember
        )
    }

    /// Returns the stable string form used in logs and provider keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Topic => "topic",
            ResourceKind::Subscription => "subscription",
            ResourceKind::Bucket => "bucket",
            ResourceKind::BucketNotification => "bucket_notification",
            ResourceKind::LogSink => "log_sink",
            ResourceKind::TopicIamMember => "topic_iam_member",
            ResourceKind::SubscriptionIamMember => "subscription_iam_member",
            ResourceKind::BucketIamMember => "bucket_iam_member",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
