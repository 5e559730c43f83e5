//! In-memory schema target
//!
//! Emulates the parts of a document engine the provisioner touches:
//! - a user registry per database
//! - collections with a primary `_id_` index
//! - index creation with engine-style naming and conflict rules
//! - document inserts that honor unique indexes
//! - a TTL sweep over timestamp fields
//!
//! Authentication can be made to fail, and individual collections can be
//! made to fail every index build, to exercise error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::auth::{AdminSession, Secret};
use crate::schema::{Grant, IndexSpec, PrincipalSpec};

use super::errors::{TargetError, TargetResult};
use super::{ExistingIndex, SchemaTarget};

type Document = Map<String, Value>;

#[derive(Debug)]
struct MemoryCollection {
    indexes: Vec<ExistingIndex>,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn new() -> Self {
        Self {
            indexes: vec![ExistingIndex::primary()],
            documents: Vec::new(),
        }
    }

    fn key_tuple(document: &Document, index: &ExistingIndex) -> Vec<Value> {
        index
            .keys
            .field_names()
            .map(|field| document.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Finds a unique index `document` would violate.
    fn violated_unique(&self, document: &Document) -> Option<&ExistingIndex> {
        self.indexes.iter().filter(|i| i.unique).find(|index| {
            let tuple = Self::key_tuple(document, index);
            self.documents
                .iter()
                .any(|existing| Self::key_tuple(existing, index) == tuple)
        })
    }

    /// Whether stored documents already hold duplicate tuples for `index`.
    fn has_duplicates_for(&self, index: &ExistingIndex) -> bool {
        let mut seen = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            let tuple = Self::key_tuple(doc, index);
            if seen.contains(&tuple) {
                return true;
            }
            seen.push(tuple);
        }
        false
    }
}

#[derive(Debug, Default)]
struct MemoryDatabase {
    users: BTreeMap<String, Vec<Grant>>,
    collections: BTreeMap<String, MemoryCollection>,
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: BTreeMap<String, MemoryDatabase>,
}

impl MemoryState {
    fn database(&mut self, name: &str) -> &mut MemoryDatabase {
        self.databases.entry(name.to_string()).or_default()
    }

    fn collection(&mut self, database: &str, collection: &str) -> &mut MemoryCollection {
        self.database(database)
            .collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new)
    }

    fn existing_collection(&self, database: &str, collection: &str) -> Option<&MemoryCollection> {
        self.databases
            .get(database)
            .and_then(|db| db.collections.get(collection))
    }
}

/// In-memory schema target
#[derive(Debug)]
pub struct MemoryTarget {
    state: Mutex<MemoryState>,
    /// Session returned by `authenticate`; `Err` rejects authentication
    session: Result<AdminSession, TargetError>,
    /// Collections whose index builds always fail
    failing: Mutex<HashMap<String, TargetError>>,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTarget {
    /// An empty engine authenticating as a superuser.
    pub fn new() -> Self {
        Self::with_session(AdminSession::superuser("root"))
    }

    /// An empty engine authenticating as `session`.
    pub fn with_session(session: AdminSession) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            session: Ok(session),
            failing: Mutex::new(HashMap::new()),
        }
    }

    /// An engine that rejects every authentication attempt.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            session: Err(TargetError::Authentication(reason.into())),
            failing: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self) -> TargetResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| TargetError::Other("Lock poisoned".to_string()))
    }

    /// Makes every index build on `collection` fail with `error`.
    pub fn fail_indexes_on(&self, collection: impl Into<String>, error: TargetError) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(collection.into(), error);
        }
    }

    /// Places an index directly, bypassing conflict checks.
    pub fn seed_index(&self, database: &str, collection: &str, index: ExistingIndex) -> TargetResult<()> {
        self.state()?.collection(database, collection).indexes.push(index);
        Ok(())
    }

    /// Places a user directly.
    pub fn seed_principal(&self, database: &str, name: &str, grants: Vec<Grant>) -> TargetResult<()> {
        self.state()?
            .database(database)
            .users
            .insert(name.to_string(), grants);
        Ok(())
    }

    /// Inserts a JSON object, enforcing unique indexes.
    ///
    /// Creates the collection on first write.
    pub fn insert(&self, database: &str, collection: &str, document: Value) -> TargetResult<()> {
        let document = match document {
            Value::Object(map) => map,
            other => {
                return Err(TargetError::Other(format!(
                    "documents must be objects, got {}",
                    other
                )))
            }
        };

        let mut state = self.state()?;
        let coll = state.collection(database, collection);
        if let Some(index) = coll.violated_unique(&document) {
            return Err(TargetError::DuplicateKey(format!(
                "{}.{} index {}",
                database, collection, index.name
            )));
        }
        coll.documents.push(document);
        Ok(())
    }

    /// Removes documents whose TTL field is older than the index allows.
    ///
    /// Timestamps are RFC 3339 strings. Documents without a parsable
    /// timestamp in the indexed field never expire. Returns the number of
    /// documents removed.
    pub fn expire(&self, now: DateTime<Utc>) -> TargetResult<usize> {
        let mut state = self.state()?;
        let mut removed = 0;

        for db in state.databases.values_mut() {
            for coll in db.collections.values_mut() {
                let ttl = coll.indexes.iter().find_map(|index| {
                    let seconds = index.ttl_seconds?;
                    let field = index.keys.field_names().next()?.to_string();
                    Some((field, seconds))
                });
                let Some((field, seconds)) = ttl else {
                    continue;
                };
                let cutoff = now - Duration::seconds(seconds as i64);

                let before = coll.documents.len();
                coll.documents.retain(|doc| {
                    doc.get(&field)
                        .and_then(Value::as_str)
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map_or(true, |ts| ts.with_timezone(&Utc) >= cutoff)
                });
                removed += before - coll.documents.len();
            }
        }

        Ok(removed)
    }

    /// Collection names in `database`, sorted.
    pub fn collection_names(&self, database: &str) -> TargetResult<Vec<String>> {
        Ok(self
            .state()?
            .databases
            .get(database)
            .map(|db| db.collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Grants held by a user, if it exists.
    pub fn principal_grants(&self, database: &str, name: &str) -> TargetResult<Option<Vec<Grant>>> {
        Ok(self
            .state()?
            .databases
            .get(database)
            .and_then(|db| db.users.get(name).cloned()))
    }

    /// Number of documents stored in a collection.
    pub fn document_count(&self, database: &str, collection: &str) -> TargetResult<usize> {
        Ok(self
            .state()?
            .existing_collection(database, collection)
            .map_or(0, |c| c.documents.len()))
    }
}

#[async_trait]
impl SchemaTarget for MemoryTarget {
    async fn authenticate(&self) -> TargetResult<AdminSession> {
        self.session.clone()
    }

    async fn principal_exists(&self, database: &str, name: &str) -> TargetResult<bool> {
        Ok(self
            .state()?
            .databases
            .get(database)
            .map_or(false, |db| db.users.contains_key(name)))
    }

    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
        _password: &Secret,
    ) -> TargetResult<()> {
        let mut state = self.state()?;
        let users = &mut state.database(database).users;
        if users.contains_key(&principal.name) {
            return Err(TargetError::AlreadyExists(format!(
                "user {}@{}",
                principal.name, database
            )));
        }
        users.insert(principal.name.clone(), principal.grants.clone());
        Ok(())
    }

    async fn collection_exists(&self, database: &str, collection: &str) -> TargetResult<bool> {
        Ok(self.state()?.existing_collection(database, collection).is_some())
    }

    async fn create_collection(&self, database: &str, collection: &str) -> TargetResult<()> {
        let mut state = self.state()?;
        let collections = &mut state.database(database).collections;
        if collections.contains_key(collection) {
            return Err(TargetError::AlreadyExists(format!(
                "collection {}.{}",
                database, collection
            )));
        }
        collections.insert(collection.to_string(), MemoryCollection::new());
        Ok(())
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> TargetResult<Vec<ExistingIndex>> {
        Ok(self
            .state()?
            .existing_collection(database, collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> TargetResult<String> {
        let injected = self
            .failing
            .lock()
            .map_err(|_| TargetError::Other("Lock poisoned".to_string()))?
            .get(collection)
            .cloned();
        if let Some(error) = injected {
            return Err(error);
        }

        let wanted = ExistingIndex::from_spec(index);
        let mut state = self.state()?;
        let coll = state.collection(database, collection);

        if let Some(same_keys) = coll.indexes.iter().find(|i| i.keys == wanted.keys) {
            return if same_keys.unique == wanted.unique && same_keys.ttl_seconds == wanted.ttl_seconds {
                Err(TargetError::AlreadyExists(format!("index {}", same_keys.name)))
            } else {
                Err(TargetError::Conflict(format!(
                    "index {} exists with different options",
                    same_keys.name
                )))
            };
        }

        if let Some(same_name) = coll.indexes.iter().find(|i| i.name == wanted.name) {
            return Err(TargetError::Conflict(format!(
                "index {} exists with key pattern {}",
                same_name.name, same_name.keys
            )));
        }

        if wanted.unique && coll.has_duplicates_for(&wanted) {
            return Err(TargetError::DuplicateKey(format!(
                "{}.{} holds duplicate values for {}",
                database, collection, wanted.keys
            )));
        }

        let name = wanted.name.clone();
        coll.indexes.push(wanted);
        Ok(name)
    }
}
