//! Schema targets
//!
//! A `SchemaTarget` is the database as the provisioner sees it: a handful of
//! existence checks and create operations. Every operation names its
//! database explicitly; targets hold no "current database".
//!
//! Backends:
//! - `MongoTarget`: a MongoDB deployment through the official driver
//! - `MemoryTarget`: an in-process engine with the same semantics

mod errors;
mod memory;
mod mongo;

use async_trait::async_trait;

use crate::auth::{AdminSession, Secret};
use crate::schema::{IndexSpec, KeyPattern, PrincipalSpec};

pub use errors::{TargetError, TargetResult};
pub use memory::MemoryTarget;
pub use mongo::{MongoSettings, MongoTarget};

/// Name of the primary-key index every collection carries.
pub const PRIMARY_INDEX_NAME: &str = "_id_";

/// An index as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIndex {
    pub name: String,
    pub keys: KeyPattern,
    pub unique: bool,
    pub ttl_seconds: Option<u64>,
}

impl ExistingIndex {
    /// The index `spec` would produce.
    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            name: spec.effective_name(),
            keys: spec.keys.clone(),
            unique: spec.unique,
            ttl_seconds: spec.ttl_seconds,
        }
    }

    /// The primary-key index.
    pub fn primary() -> Self {
        Self {
            name: PRIMARY_INDEX_NAME.to_string(),
            keys: KeyPattern::new().asc("_id"),
            unique: true,
            ttl_seconds: None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX_NAME
    }

    /// Whether this index satisfies `spec` (same key pattern).
    pub fn matches(&self, spec: &IndexSpec) -> bool {
        self.keys == spec.keys
    }

    /// Describes option differences from `spec`, if any.
    pub fn drift_from(&self, spec: &IndexSpec) -> Option<String> {
        let mut diffs = Vec::new();
        if self.unique != spec.unique {
            diffs.push(format!("unique is {}, manifest wants {}", self.unique, spec.unique));
        }
        if self.ttl_seconds != spec.ttl_seconds {
            diffs.push(format!(
                "ttl_seconds is {}, manifest wants {}",
                describe_ttl(self.ttl_seconds),
                describe_ttl(spec.ttl_seconds)
            ));
        }
        if diffs.is_empty() {
            None
        } else {
            Some(diffs.join("; "))
        }
    }
}

fn describe_ttl(ttl: Option<u64>) -> String {
    ttl.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// The database operations the provisioner needs.
#[async_trait]
pub trait SchemaTarget: Send + Sync {
    /// Verifies the connection's credentials and reports its roles.
    async fn authenticate(&self) -> TargetResult<AdminSession>;

    /// Whether a user named `name` exists in `database`.
    async fn principal_exists(&self, database: &str, name: &str) -> TargetResult<bool>;

    /// Creates a user in `database` with exactly the principal's grants.
    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
        password: &Secret,
    ) -> TargetResult<()>;

    async fn collection_exists(&self, database: &str, collection: &str) -> TargetResult<bool>;

    async fn create_collection(&self, database: &str, collection: &str) -> TargetResult<()>;

    /// Lists indexes on a collection. A missing collection has none.
    async fn list_indexes(&self, database: &str, collection: &str)
        -> TargetResult<Vec<ExistingIndex>>;

    /// Creates an index and returns its name.
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> TargetResult<String>;
}
