//! The schema provisioner
//!
//! Reconciles a target database with a manifest, adding what is missing and
//! never altering or removing what exists. Every step is idempotent; a run
//! can be repeated at any time.
//!
//! Order of operations:
//! 1. Authenticate and check privileges (fatal on failure)
//! 2. Create the application principal if absent
//! 3. For each collection in declared order, create it if absent, then
//!    create each index whose key pattern is not already indexed
//!
//! Calls are issued one at a time; each is awaited before the next.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::SecretSource;
use crate::schema::{CollectionSpec, IndexSpec, ManifestLoader, PrincipalSpec, SchemaManifest};
use crate::target::{ExistingIndex, SchemaTarget};

use super::errors::{auth_error_from, ObjectRef, ProvisionError, ProvisionFailure};
use super::observer::{NoopObserver, ProvisionEvent, ProvisionObserver};
use super::report::{CollectionReport, IndexReport, Outcome, PrincipalReport, ProvisionReport};

/// What to do after an object fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep going
    #[default]
    Isolate,
    /// Stop at the first failure and return it
    FailFast,
}

/// Drives one provisioning run against a target.
pub struct Provisioner<'t, T: SchemaTarget + ?Sized> {
    target: &'t T,
    policy: FailurePolicy,
    observer: Box<dyn ProvisionObserver + 't>,
}

impl<'t, T: SchemaTarget + ?Sized> Provisioner<'t, T> {
    pub fn new(target: &'t T) -> Self {
        Self {
            target,
            policy: FailurePolicy::default(),
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: impl ProvisionObserver + 't) -> Self {
        self.observer = Box::new(observer);
        self
    }

    fn emit(&mut self, event: ProvisionEvent<'_>) {
        self.observer.on_event(&event);
    }

    fn fail_fast(&self) -> bool {
        self.policy == FailurePolicy::FailFast
    }

    /// Brings the target in line with `manifest`.
    ///
    /// `principal_secret` supplies the application principal's password. It
    /// is asked for only if the principal has to be created; a secret that
    /// cannot be resolved fails the principal, not the run.
    pub async fn provision<S: SecretSource + ?Sized>(
        &mut self,
        manifest: &SchemaManifest,
        principal_secret: &S,
    ) -> Result<ProvisionReport, ProvisionFailure> {
        let started_at = Utc::now();

        let session = self.target.authenticate().await.map_err(auth_error_from)?;
        session.authorize(manifest)?;
        self.emit(ProvisionEvent::Authenticated {
            user: &session.user,
        });

        let database = manifest.database.as_str();
        self.emit(ProvisionEvent::DatabaseSelected { database });

        let principal = self
            .reconcile_principal(database, &manifest.principal, principal_secret)
            .await;
        if let (true, Some(error)) = (self.fail_fast(), &principal.error) {
            return Err(error.clone().into());
        }

        let mut collections = Vec::with_capacity(manifest.collections.len());
        for spec in &manifest.collections {
            let report = self.reconcile_collection(database, spec).await;
            self.emit(ProvisionEvent::CollectionDone { report: &report });
            if let (true, Some(error)) = (self.fail_fast(), report.errors.first()) {
                return Err(error.clone().into());
            }
            collections.push(report);
        }

        Ok(ProvisionReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            database: manifest.database.clone(),
            manifest_digest: ManifestLoader::digest(manifest),
            principal,
            collections,
        })
    }

    async fn reconcile_principal<S: SecretSource + ?Sized>(
        &mut self,
        database: &str,
        principal: &PrincipalSpec,
        secret: &S,
    ) -> PrincipalReport {
        let name = principal.name.as_str();
        let outcome = match self.target.principal_exists(database, name).await {
            Ok(true) => Ok(Outcome::AlreadyExisted),
            Ok(false) => self.create_principal(database, principal, secret).await,
            Err(e) => Err(ProvisionError::from_target(ObjectRef::principal(database, name), e)),
        };

        match outcome {
            Ok(Outcome::Created) => {
                self.emit(ProvisionEvent::PrincipalCreated { name });
                PrincipalReport::new(name, Outcome::Created)
            }
            Ok(outcome) => {
                self.emit(ProvisionEvent::PrincipalExisted { name });
                PrincipalReport::new(name, outcome)
            }
            Err(error) => {
                self.emit(ProvisionEvent::Failed { error: &error });
                PrincipalReport::failed(name, error)
            }
        }
    }

    async fn create_principal<S: SecretSource + ?Sized>(
        &self,
        database: &str,
        principal: &PrincipalSpec,
        secret: &S,
    ) -> Result<Outcome, ProvisionError> {
        let object = ObjectRef::principal(database, &principal.name);
        let secret = secret
            .secret()
            .map_err(|e| ProvisionError::from_auth(object.clone(), e))?;

        match self.target.create_principal(database, principal, &secret).await {
            Ok(()) => Ok(Outcome::Created),
            Err(e) if e.is_already_exists() => Ok(Outcome::AlreadyExisted),
            Err(e) => Err(ProvisionError::from_target(object, e)),
        }
    }

    fn record(&mut self, report: &mut CollectionReport, error: ProvisionError) {
        self.emit(ProvisionEvent::Failed { error: &error });
        report.errors.push(error);
    }

    async fn reconcile_collection(
        &mut self,
        database: &str,
        spec: &CollectionSpec,
    ) -> CollectionReport {
        let collection = spec.name.as_str();
        let mut report = CollectionReport::new(collection);

        let exists = match self.target.collection_exists(database, collection).await {
            Ok(true) => Ok(true),
            Ok(false) => match self.target.create_collection(database, collection).await {
                Ok(()) => Ok(false),
                Err(e) if e.is_already_exists() => Ok(true),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        match exists {
            Ok(existed) => report.already_existed = existed,
            Err(e) => {
                let object = ObjectRef::collection(database, collection);
                self.record(&mut report, ProvisionError::from_target(object, e));
                return report;
            }
        }

        let existing = match self.target.list_indexes(database, collection).await {
            Ok(existing) => existing,
            Err(e) => {
                let object = ObjectRef::collection(database, collection);
                self.record(&mut report, ProvisionError::from_target(object, e));
                return report;
            }
        };

        for index in &spec.indexes {
            let failed = self
                .reconcile_index(database, collection, index, &existing, &mut report)
                .await;
            if failed && self.fail_fast() {
                break;
            }
        }

        report
    }

    /// Returns true if the index failed.
    async fn reconcile_index(
        &mut self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
        existing: &[ExistingIndex],
        report: &mut CollectionReport,
    ) -> bool {
        if let Some(found) = existing.iter().find(|e| e.matches(index)) {
            let drift = found.drift_from(index);
            self.emit(ProvisionEvent::IndexExisted {
                collection,
                index: &found.name,
                drift: drift.as_deref(),
            });
            report.indexes.push(IndexReport::existing(
                found.name.clone(),
                index.keys.clone(),
                drift,
            ));
            return false;
        }

        match self.target.create_index(database, collection, index).await {
            Ok(name) => {
                self.emit(ProvisionEvent::IndexCreated {
                    collection,
                    index: &name,
                });
                report.indexes_created += 1;
                report.indexes.push(IndexReport::created(name, index.keys.clone()));
                false
            }
            Err(e) if e.is_already_exists() => {
                let name = index.effective_name();
                self.emit(ProvisionEvent::IndexExisted {
                    collection,
                    index: &name,
                    drift: None,
                });
                report
                    .indexes
                    .push(IndexReport::existing(name, index.keys.clone(), None));
                false
            }
            Err(e) => {
                let name = index.effective_name();
                let object = ObjectRef::index(database, collection, &name);
                report.indexes.push(IndexReport::failed(name, index.keys.clone()));
                self.record(report, ProvisionError::from_target(object, e));
                true
            }
        }
    }
}

/// Provisions `manifest` with the default failure policy and no observer.
pub async fn provision<T: SchemaTarget + ?Sized, S: SecretSource + ?Sized>(
    target: &T,
    manifest: &SchemaManifest,
    principal_secret: &S,
) -> Result<ProvisionReport, ProvisionFailure> {
    Provisioner::new(target)
        .provision(manifest, principal_secret)
        .await
}
