//! Target error types
//!
//! Backends translate engine-specific failures into these kinds so the
//! provisioner can tell "already exists" (success) apart from genuine
//! failures.

use thiserror::Error;

/// Result type for target operations
pub type TargetResult<T> = Result<T, TargetError>;

/// Errors reported by a schema target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The object is already present. Never a failure for the provisioner.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An existing object conflicts with the requested definition
    #[error("conflicting definition: {0}")]
    Conflict(String),

    /// Existing data violates a requested unique constraint
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Credentials rejected
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but not permitted
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Server unreachable or connection dropped
    #[error("connection failed: {0}")]
    Connection(String),

    /// Anything else the engine reported
    #[error("{0}")]
    Other(String),
}

impl TargetError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, TargetError::AlreadyExists(_))
    }
}
