//! Schema manifest subsystem
//!
//! A manifest is the declarative, immutable description of one database's
//! desired state: the application principal, the collections, and their
//! indexes.
//!
//! # Design Principles
//!
//! - Manifests are validated before any connection is opened
//! - Key patterns keep their declared field order
//! - Credentials appear only as references, never literals

mod builtin;
mod errors;
mod loader;
mod types;
mod validator;

pub use builtin::{
    builtin_manifest, FINANCE_DATABASE, FINANCE_PRINCIPAL, FINANCE_PRINCIPAL_PASSWORD_ENV,
    MINUTE_BAR_RETENTION_SECONDS,
};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use loader::ManifestLoader;
pub use types::{
    CollectionSpec, Grant, IndexSpec, KeyPattern, PrincipalSpec, SchemaManifest, SortDirection,
};
pub use validator::ManifestValidator;
