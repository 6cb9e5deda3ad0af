//! Sync framework error types
//!
//! Error definitions with transient/permanent classification for the host's
//! retry logic. The framework itself never retries: every error is returned
//! to the immediate caller, and progress already committed to a continuation
//! token survives the failure.

use thiserror::Error;

/// Error that can occur while syncing an upstream system.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A continuation token could not be decoded.
    #[error("malformed continuation token: {message}")]
    MalformedToken { message: String },

    /// A composite identifier did not have the expected
    /// `<resource_type>:<resource_id>:<entitlement_id>` shape.
    #[error("malformed composite id: {id}")]
    MalformedId { id: String },

    /// An upstream listing or fetch failed. Carries the name of the
    /// offending operation for diagnostics.
    #[error("upstream operation '{operation}' failed: {source}")]
    Upstream {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A grant or revoke targeted a principal type other than a user.
    #[error("unsupported principal type: {principal_type}")]
    UnsupportedPrincipal { principal_type: String },

    /// An observed role string has no mapping to a known entitlement.
    #[error("unsupported role: {role}")]
    UnsupportedRole { role: String },

    /// A resource profile is missing an expected value.
    #[error("missing profile value: {key}")]
    MissingProfileValue { key: String },

    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The configured credentials lack the permissions the sync needs.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },
}

impl SyncError {
    /// Check if this error is transient and the host may retry the call.
    ///
    /// Only upstream failures are retryable; everything else requires a
    /// configuration or data fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Upstream { .. })
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    // Convenience constructors

    /// Create a malformed token error.
    pub fn malformed_token(message: impl Into<String>) -> Self {
        SyncError::MalformedToken {
            message: message.into(),
        }
    }

    /// Create an upstream failure wrapping the source error.
    pub fn upstream(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Upstream {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        SyncError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        SyncError::PermissionDenied {
            message: message.into(),
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
