//! External configuration for the stack.

use serde::{Deserialize, Serialize};

/// Inputs the stack needs from its environment.
///
/// The project number and storage service account come from the target
/// project (the driver pre-flights them); the consumer service account
/// is optional and gates the consumer grant subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Numeric project identifier.
    pub project_number: String,
    /// The project's storage service account (grants the bucket
    /// permission to publish notification events).
    pub storage_service_account: String,
    /// Optional consumer service account email. When absent or empty,
    /// no consumer grants are declared.
    #[serde(default)]
    pub consumer_service_account: Option<String>,
}

impl StackConfig {
    /// The project's message-service principal, derived from the project
    /// number.
    #[must_use]
    pub fn pubsub_principal(&self) -> String {
        format!(
            "serviceAccount:service-{}@gcp-sa-pubsub.iam.gserviceaccount.com",
            self.project_number
        )
    }

    /// The storage service account as an IAM principal.
    #[must_use]
    pub fn storage_principal(&self) -> String {
        format!("serviceAccount:{}", self.storage_service_account)
    }

    /// The consumer service account as an IAM principal, if configured.
    ///
    /// An empty string counts as absent.
    #[must_use]
    pub fn consumer_principal(&self) -> Option<String> {
        self.consumer_service_account
            .as_deref()
            .filter(|account| !account.is_empty())
            .map(|account| format!("serviceAccount:{account}"))
    }
}
