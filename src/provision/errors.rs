//! Provisioning error types
//!
//! - `ProvisionError`: one schema object could not be reconciled. Recorded
//!   in the report; later objects are still attempted.
//! - `ProvisionFailure`: why a run returned no report at all.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::target::TargetError;

/// The schema object an error applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectRef {
    Principal {
        database: String,
        name: String,
    },
    Collection {
        database: String,
        collection: String,
    },
    Index {
        database: String,
        collection: String,
        index: String,
    },
}

impl ObjectRef {
    pub fn principal(database: &str, name: &str) -> Self {
        ObjectRef::Principal {
            database: database.to_string(),
            name: name.to_string(),
        }
    }

    pub fn collection(database: &str, collection: &str) -> Self {
        ObjectRef::Collection {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }

    pub fn index(database: &str, collection: &str, index: &str) -> Self {
        ObjectRef::Index {
            database: database.to_string(),
            collection: collection.to_string(),
            index: index.to_string(),
        }
    }

    /// Collection this object belongs to, if any.
    pub fn collection_name(&self) -> Option<&str> {
        match self {
            ObjectRef::Principal { .. } => None,
            ObjectRef::Collection { collection, .. } | ObjectRef::Index { collection, .. } => {
                Some(collection)
            }
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Principal { database, name } => write!(f, "user {}@{}", name, database),
            ObjectRef::Collection {
                database,
                collection,
            } => write!(f, "collection {}.{}", database, collection),
            ObjectRef::Index {
                database,
                collection,
                index,
            } => write!(f, "index {}.{}.{}", database, collection, index),
        }
    }
}

/// Why an object could not be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionErrorKind {
    /// An existing object conflicts with the manifest's definition
    Conflict,
    /// Existing data violates a unique index
    DuplicateKey,
    /// The admin session may not perform the operation
    PermissionDenied,
    /// Server unreachable mid-run
    Connection,
    /// A credential needed for the object could not be resolved
    Credential,
    /// Any other engine failure
    Engine,
}

impl ProvisionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionErrorKind::Conflict => "conflict",
            ProvisionErrorKind::DuplicateKey => "duplicate_key",
            ProvisionErrorKind::PermissionDenied => "permission_denied",
            ProvisionErrorKind::Connection => "connection",
            ProvisionErrorKind::Credential => "credential",
            ProvisionErrorKind::Engine => "engine",
        }
    }
}

impl fmt::Display for ProvisionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema object that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{object}: {kind}: {message}")]
pub struct ProvisionError {
    pub object: ObjectRef,
    pub kind: ProvisionErrorKind,
    pub message: String,
}

impl ProvisionError {
    pub fn new(object: ObjectRef, kind: ProvisionErrorKind, message: impl Into<String>) -> Self {
        Self {
            object,
            kind,
            message: message.into(),
        }
    }

    /// Classifies a target failure against `object`.
    pub fn from_target(object: ObjectRef, error: TargetError) -> Self {
        let (kind, message) = match error {
            TargetError::Conflict(m) => (ProvisionErrorKind::Conflict, m),
            TargetError::DuplicateKey(m) => (ProvisionErrorKind::DuplicateKey, m),
            TargetError::Unauthorized(m) | TargetError::Authentication(m) => {
                (ProvisionErrorKind::PermissionDenied, m)
            }
            TargetError::Connection(m) => (ProvisionErrorKind::Connection, m),
            TargetError::AlreadyExists(m) | TargetError::Other(m) => (ProvisionErrorKind::Engine, m),
        };
        Self::new(object, kind, message)
    }

    /// A credential for `object` could not be resolved.
    pub fn from_auth(object: ObjectRef, error: AuthError) -> Self {
        Self::new(object, ProvisionErrorKind::Credential, error.to_string())
    }
}

/// A run that produced no report.
#[derive(Debug, Error)]
pub enum ProvisionFailure {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// First object failure under the fail-fast policy
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Maps a failed `authenticate` call.
pub(crate) fn auth_error_from(error: TargetError) -> AuthError {
    match error {
        TargetError::Connection(m) => AuthError::Unreachable(m),
        other => AuthError::Rejected(other.to_string()),
    }
}
