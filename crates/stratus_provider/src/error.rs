//! Error taxonomy for provider operations.

use stratus_resource::ResourceKind;

/// Error applying or looking up a resource.
///
/// The engine only distinguishes transient from fatal errors (see
/// [`ApplyError::is_transient`]); everything else is carried for
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// A retryable failure: timeout, quota exhaustion, rate limiting.
    #[error("transient provider failure: {reason}")]
    Transient {
        /// Provider-supplied description of the failure.
        reason: String,
    },

    /// The resource already exists with a configuration that differs
    /// from the requested one.
    #[error("configuration drift on {kind} '{name}': {detail}")]
    ConfigurationDrift {
        /// Kind of the drifted resource.
        kind: ResourceKind,
        /// Logical name of the drifted resource.
        name: String,
        /// What differs.
        detail: String,
    },

    /// The caller lacks permission for the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The request was structurally invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation conflicts with concurrent remote state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ApplyError {
    /// Returns `true` if the failure may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ApplyError::Transient { .. })
    }

    /// Convenience constructor for transient failures.
    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        ApplyError::Transient {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(ApplyError::transient("quota exceeded").is_transient());
        assert!(!ApplyError::PermissionDenied("nope".to_string()).is_transient());
        assert!(!ApplyError::InvalidArgument("bad".to_string()).is_transient());
        assert!(
            !ApplyError::ConfigurationDrift {
                kind: ResourceKind::Bucket,
                name: "log-bucket".to_string(),
                detail: "location".to_string(),
            }
            .is_transient()
        );
    }
}
