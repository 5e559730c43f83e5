//! # Auth Errors
//!
//! Error types for administrative authentication. Every `AuthError` is fatal
//! to a provisioning run: nothing downstream can succeed without it.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ==================
    // Credential Errors
    // ==================
    /// Environment variable holding a credential is not set
    #[error("Credential variable '{0}' is not set")]
    MissingCredential(String),

    /// Credential present but unusable (empty, control characters)
    #[error("Credential variable '{var}' is malformed: {reason}")]
    MalformedCredential { var: String, reason: String },

    // ==================
    // Server Errors
    // ==================
    /// Server refused the credentials
    #[error("Authentication rejected: {0}")]
    Rejected(String),

    /// Server could not be reached to authenticate
    #[error("Server unreachable during authentication: {0}")]
    Unreachable(String),

    // ==================
    // Privilege Errors
    // ==================
    /// Authenticated, but cannot administer the target database
    #[error("User '{user}' cannot administer database '{database}'")]
    InsufficientPrivileges { user: String, database: String },

    /// The principal would be granted a role outside the administered scope
    #[error("Grant '{grant}' is outside the databases user '{user}' can administer")]
    GrantOutOfScope { user: String, grant: String },
}

impl AuthError {
    /// Stable error code for logs and exit reporting
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential(_) => "PROV_AUTH_MISSING_CREDENTIAL",
            AuthError::MalformedCredential { .. } => "PROV_AUTH_MALFORMED_CREDENTIAL",
            AuthError::Rejected(_) => "PROV_AUTH_REJECTED",
            AuthError::Unreachable(_) => "PROV_AUTH_UNREACHABLE",
            AuthError::InsufficientPrivileges { .. } => "PROV_AUTH_INSUFFICIENT_PRIVILEGES",
            AuthError::GrantOutOfScope { .. } => "PROV_AUTH_GRANT_OUT_OF_SCOPE",
        }
    }

    /// Whether the error arose before contacting the server
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential(_) | AuthError::MalformedCredential { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AuthError::MissingCredential("X".into()).code(),
            "PROV_AUTH_MISSING_CREDENTIAL"
        );
        assert_eq!(AuthError::Rejected("bad".into()).code(), "PROV_AUTH_REJECTED");
    }

    #[test]
    fn test_local_errors() {
        assert!(AuthError::MissingCredential("X".into()).is_local());
        assert!(!AuthError::Rejected("bad".into()).is_local());
    }

    #[test]
    fn test_messages_name_the_variable_not_the_value() {
        let err = AuthError::MalformedCredential {
            var: "MONGO_INITDB_ROOT_PASSWORD".into(),
            reason: "empty".into(),
        };
        assert!(err.to_string().contains("MONGO_INITDB_ROOT_PASSWORD"));
    }
}
