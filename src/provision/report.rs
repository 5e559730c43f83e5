//! Provision report
//!
//! What a run did, object by object. The report is the primary output of
//! the provisioner; callers decide how to render it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::KeyPattern;

use super::errors::ProvisionError;

/// What happened to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyExisted,
    Failed,
}

/// Application principal result.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalReport {
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProvisionError>,
}

impl PrincipalReport {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: ProvisionError) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Failed,
            error: Some(error),
        }
    }
}

/// One index result.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub name: String,
    pub keys: KeyPattern,
    pub outcome: Outcome,
    /// Option differences on an existing equivalent index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<String>,
}

impl IndexReport {
    pub fn created(name: impl Into<String>, keys: KeyPattern) -> Self {
        Self {
            name: name.into(),
            keys,
            outcome: Outcome::Created,
            drift: None,
        }
    }

    pub fn existing(name: impl Into<String>, keys: KeyPattern, drift: Option<String>) -> Self {
        Self {
            name: name.into(),
            keys,
            outcome: Outcome::AlreadyExisted,
            drift,
        }
    }

    pub fn failed(name: impl Into<String>, keys: KeyPattern) -> Self {
        Self {
            name: name.into(),
            keys,
            outcome: Outcome::Failed,
            drift: None,
        }
    }
}

/// One collection result.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub name: String,
    pub already_existed: bool,
    pub indexes_created: usize,
    pub indexes: Vec<IndexReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProvisionError>,
}

impl CollectionReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            already_existed: false,
            indexes_created: 0,
            indexes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Looks up an index result by name.
    pub fn index(&self, name: &str) -> Option<&IndexReport> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Result of a provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub database: String,
    /// SHA-256 of the manifest the run used
    pub manifest_digest: String,
    pub principal: PrincipalReport,
    pub collections: Vec<CollectionReport>,
}

impl ProvisionReport {
    /// Every object failure, principal first, then collections in order.
    pub fn failures(&self) -> Vec<&ProvisionError> {
        self.principal
            .error
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.errors.iter()))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Whether the run found everything already in place.
    pub fn all_existed(&self) -> bool {
        self.principal.outcome == Outcome::AlreadyExisted
            && self.collections.iter().all(|c| {
                c.already_existed
                    && c.indexes
                        .iter()
                        .all(|i| i.outcome == Outcome::AlreadyExisted)
            })
    }

    pub fn collections_created(&self) -> usize {
        self.collections
            .iter()
            .filter(|c| !c.already_existed && !c.is_failed())
            .count()
    }

    pub fn indexes_created(&self) -> usize {
        self.collections.iter().map(|c| c.indexes_created).sum()
    }
}
