//! Error types for authorization operations
//!
//! Callers must be able to tell "access denied" (expected, client-facing)
//! apart from "authorization infrastructure failed" (server error). Every
//! variant carries the context needed for the audit trail.

use std::path::PathBuf;

use thiserror::Error;

use crate::directory::RepositoryError;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No requirement group was satisfied.
    #[error("Access denied: {subject} may not {action} {resource}")]
    AccessDenied {
        /// Principal email.
        subject: String,
        /// Resource name.
        resource: String,
        /// Action name.
        action: String,
    },

    /// The policy engine failed while evaluating a request.
    #[error("Policy evaluation failed for {subject} on {resource}:{action}")]
    PolicyEvaluation {
        /// Principal email.
        subject: String,
        /// Resource name.
        resource: String,
        /// Action name.
        action: String,
        /// Engine error.
        #[source]
        source: casbin::Error,
    },

    /// The policy engine failed while loading, mutating or persisting rules.
    #[error("Policy store operation '{operation}' failed")]
    PolicyStore {
        /// Store operation that failed.
        operation: &'static str,
        /// Engine error.
        #[source]
        source: casbin::Error,
    },

    /// The policy file could not be prepared.
    #[error("Policy file {path} is not accessible")]
    PolicyFile {
        /// Policy file path.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A customer could not be provisioned for a principal.
    #[error("Failed to create customer for {email}: {reason}")]
    CustomerCreation {
        /// Principal email.
        email: String,
        /// What went wrong.
        reason: String,
        /// Underlying persistence error, if any.
        #[source]
        source: Option<RepositoryError>,
    },

    /// A rule value cannot be stored as one column of the policy file.
    #[error("Invalid policy value {value:?}: {reason}")]
    InvalidPolicy {
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A restore payload is structurally invalid.
    #[error("Invalid policy backup: {0}")]
    InvalidBackup(String),

    /// The referenced user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A directory (customer, ownership or user lookup) failed.
    #[error("Directory error: {0}")]
    Directory(#[from] RepositoryError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl AuthzError {
    /// Check if this error should be logged at error level.
    ///
    /// Denials and bad admin input are expected outcomes.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Check if this error is an authorization denial.
    pub fn is_denied(&self) -> bool {
        matches!(self, AuthzError::AccessDenied { .. })
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::AccessDenied { .. } => 403,
            AuthzError::UserNotFound(_) => 404,
            AuthzError::InvalidBackup(_) | AuthzError::InvalidPolicy { .. } => 400,

            AuthzError::PolicyEvaluation { .. }
            | AuthzError::PolicyStore { .. }
            | AuthzError::PolicyFile { .. }
            | AuthzError::CustomerCreation { .. }
            | AuthzError::Directory(_)
            | AuthzError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::AccessDenied { .. } => "ACCESS_DENIED",
            AuthzError::PolicyEvaluation { .. } => "POLICY_EVALUATION_FAILED",
            AuthzError::PolicyStore { .. } => "POLICY_STORE_ERROR",
            AuthzError::PolicyFile { .. } => "POLICY_FILE_ERROR",
            AuthzError::CustomerCreation { .. } => "CUSTOMER_CREATION_FAILED",
            AuthzError::InvalidBackup(_) => "INVALID_BACKUP",
            AuthzError::InvalidPolicy { .. } => "INVALID_POLICY",
            AuthzError::UserNotFound(_) => "USER_NOT_FOUND",
            AuthzError::Directory(_) => "DIRECTORY_ERROR",
            AuthzError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_is_not_server_error() {
        let err = AuthzError::AccessDenied {
            subject: "ana@example.com".into(),
            resource: "quote".into(),
            action: "update".into(),
        };
        assert!(err.is_denied());
        assert!(!err.is_server_error());
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "ACCESS_DENIED");
        assert_eq!(err.to_string(), "Access denied: ana@example.com may not update quote");
    }

    #[test]
    fn test_customer_creation_keeps_source() {
        use std::error::Error as _;

        let err = AuthzError::CustomerCreation {
            email: "ana@example.com".into(),
            reason: "insert failed".into(),
            source: Some(RepositoryError::ForeignKeyViolation {
                constraint: "customers_region_fk".into(),
            }),
        };
        assert!(err.is_server_error());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthzError::InvalidBackup("x".into()).status_code(), 400);
        let invalid = AuthzError::InvalidPolicy {
            value: "a,b".into(),
            reason: "contains a comma",
        };
        assert_eq!(invalid.status_code(), 400);
        assert_eq!(invalid.error_code(), "INVALID_POLICY");
        assert_eq!(AuthzError::UserNotFound("x".into()).status_code(), 404);
        assert_eq!(AuthzError::Config("x".into()).status_code(), 500);
        assert_eq!(
            AuthzError::from(RepositoryError::Unavailable("down".into())).error_code(),
            "DIRECTORY_ERROR"
        );
    }
}
