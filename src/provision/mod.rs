//! Schema provisioning
//!
//! Reconciles a `SchemaTarget` with a `SchemaManifest` and reports what
//! happened to every object.
//!
//! # Usage
//!
//! ```ignore
//! use schema_provisioner::provision::{FailurePolicy, LogObserver, Provisioner};
//!
//! let report = Provisioner::new(&target)
//!     .with_policy(FailurePolicy::Isolate)
//!     .with_observer(LogObserver)
//!     .provision(&manifest, &secret)
//!     .await?;
//! ```

mod errors;
mod observer;
mod provisioner;
mod report;

pub use errors::{ObjectRef, ProvisionError, ProvisionErrorKind, ProvisionFailure};
pub use observer::{ConsoleObserver, LogObserver, NoopObserver, ProvisionEvent, ProvisionObserver};
pub use provisioner::{provision, FailurePolicy, Provisioner};
pub use report::{CollectionReport, IndexReport, Outcome, PrincipalReport, ProvisionReport};
