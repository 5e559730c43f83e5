//! Manifest error types
//!
//! Error codes:
//! - PROV_MANIFEST_MALFORMED
//! - PROV_MANIFEST_INVALID_NAME
//! - PROV_MANIFEST_DUPLICATE_COLLECTION
//! - PROV_MANIFEST_DUPLICATE_INDEX
//! - PROV_MANIFEST_INVALID_KEY_PATTERN
//! - PROV_MANIFEST_INVALID_TTL
//! - PROV_MANIFEST_INVALID_PRINCIPAL
//!
//! Every manifest error is fatal: provisioning never starts from a manifest
//! that fails validation.

use std::fmt;

/// Manifest error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// File unreadable or not valid manifest JSON
    Malformed,
    /// Database or collection name not accepted by the engine
    InvalidName,
    /// Two collections share a name
    DuplicateCollection,
    /// Two indexes in one collection share a key pattern or name
    DuplicateIndex,
    /// Empty key pattern or a field repeated within one pattern
    InvalidKeyPattern,
    /// TTL index rules violated
    InvalidTtl,
    /// Principal name, credential reference or grants unusable
    InvalidPrincipal,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::Malformed => "PROV_MANIFEST_MALFORMED",
            SchemaErrorCode::InvalidName => "PROV_MANIFEST_INVALID_NAME",
            SchemaErrorCode::DuplicateCollection => "PROV_MANIFEST_DUPLICATE_COLLECTION",
            SchemaErrorCode::DuplicateIndex => "PROV_MANIFEST_DUPLICATE_INDEX",
            SchemaErrorCode::InvalidKeyPattern => "PROV_MANIFEST_INVALID_KEY_PATTERN",
            SchemaErrorCode::InvalidTtl => "PROV_MANIFEST_INVALID_TTL",
            SchemaErrorCode::InvalidPrincipal => "PROV_MANIFEST_INVALID_PRINCIPAL",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Manifest error with the offending location
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Collection the error applies to, if any
    collection: Option<String>,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            collection: None,
        }
    }

    fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Create an error for an unreadable or unparsable manifest
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::Malformed,
            format!("Malformed manifest '{}': {}", path.into(), reason.into()),
        )
    }

    /// Create an invalid database name error
    pub fn invalid_database_name(name: &str, reason: &str) -> Self {
        Self::new(
            SchemaErrorCode::InvalidName,
            format!("Database name '{}' {}", name, reason),
        )
    }

    /// Create an invalid collection name error
    pub fn invalid_collection_name(name: &str, reason: &str) -> Self {
        Self::new(
            SchemaErrorCode::InvalidName,
            format!("Collection name '{}' {}", name, reason),
        )
        .in_collection(name)
    }

    /// Create a duplicate collection error
    pub fn duplicate_collection(name: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateCollection,
            format!("Collection '{}' is declared more than once", name),
        )
        .in_collection(name)
    }

    /// Create a duplicate index error
    pub fn duplicate_index(collection: &str, what: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateIndex,
            format!("Index {} is declared more than once", what.into()),
        )
        .in_collection(collection)
    }

    /// Create an invalid key pattern error
    pub fn invalid_key_pattern(collection: &str, reason: impl Into<String>) -> Self {
        Self::new(SchemaErrorCode::InvalidKeyPattern, reason).in_collection(collection)
    }

    /// Create an invalid TTL error
    pub fn invalid_ttl(collection: &str, reason: impl Into<String>) -> Self {
        Self::new(SchemaErrorCode::InvalidTtl, reason).in_collection(collection)
    }

    /// Create an invalid principal error
    pub fn invalid_principal(reason: impl Into<String>) -> Self {
        Self::new(SchemaErrorCode::InvalidPrincipal, reason)
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the collection the error applies to
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code)?;
        if let Some(ref collection) = self.collection {
            write!(f, "[{}] ", collection)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for manifest operations
pub type SchemaResult<T> = Result<T, SchemaError>;
