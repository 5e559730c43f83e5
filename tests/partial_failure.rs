//! Partial Failure Tests
//!
//! One object failing must not stop the rest of the run:
//! - A failed collection is reported; later collections are still provisioned
//! - Failures inside a collection do not skip its remaining indexes
//! - Conflicts and duplicate data surface as typed errors
//! - The fail-fast policy stops at the first failure instead

use schema_provisioner::auth::Secret;
use schema_provisioner::provision::{
    provision, FailurePolicy, ObjectRef, Outcome, ProvisionErrorKind, ProvisionFailure,
    Provisioner,
};
use schema_provisioner::schema::{
    builtin_manifest, CollectionSpec, IndexSpec, KeyPattern, SchemaManifest,
};
use schema_provisioner::target::{ExistingIndex, MemoryTarget, SchemaTarget, TargetError};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn secret() -> Secret {
    Secret::new("quant-password")
}

/// Three collections A, B, C, each with one index on `key`.
fn abc_manifest() -> SchemaManifest {
    let mut manifest = builtin_manifest();
    manifest.collections = ["a", "b", "c"]
        .iter()
        .map(|name| CollectionSpec::new(*name).index(IndexSpec::new(KeyPattern::new().asc("key"))))
        .collect();
    manifest
}

// =============================================================================
// Isolation
// =============================================================================

/// B fails, C (after B) still succeeds.
#[tokio::test]
async fn test_failure_is_isolated_to_collection() {
    let target = MemoryTarget::new();
    target.fail_indexes_on("b", TargetError::Other("disk full".into()));

    let report = provision(&target, &abc_manifest(), &secret()).await.unwrap();

    assert!(!report.is_success());
    assert!(!report.collection("a").unwrap().is_failed());
    assert!(report.collection("b").unwrap().is_failed());
    let c = report.collection("c").unwrap();
    assert!(!c.is_failed());
    assert_eq!(c.indexes_created, 1);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].object, ObjectRef::index("finance", "b", "key_1"));
    assert_eq!(failures[0].kind, ProvisionErrorKind::Engine);
    assert!(failures[0].message.contains("disk full"));
}

/// Every index of a failing collection is still attempted and reported.
#[tokio::test]
async fn test_failed_indexes_do_not_skip_siblings() {
    let target = MemoryTarget::new();
    let spec = IndexSpec::new(KeyPattern::new().asc("order_id")).unique();
    target
        .insert("finance", "trade_signals", json!({"_id": 1, "order_id": "X1"}))
        .unwrap();
    target
        .insert("finance", "trade_signals", json!({"_id": 2, "order_id": "X1"}))
        .unwrap();

    let mut manifest = builtin_manifest();
    manifest.collections = vec![CollectionSpec::new("trade_signals")
        .index(spec)
        .index(IndexSpec::new(KeyPattern::new().asc("status").desc("timestamp")))];

    let report = provision(&target, &manifest, &secret()).await.unwrap();

    let signals = report.collection("trade_signals").unwrap();
    assert_eq!(signals.errors.len(), 1);
    assert_eq!(signals.errors[0].kind, ProvisionErrorKind::DuplicateKey);
    assert_eq!(signals.index("order_id_1").unwrap().outcome, Outcome::Failed);
    assert_eq!(
        signals.index("status_1_timestamp_-1").unwrap().outcome,
        Outcome::Created
    );
    assert_eq!(signals.indexes_created, 1);
}

/// An index name taken by a different key pattern is a conflict.
#[tokio::test]
async fn test_name_conflict_is_reported() {
    let target = MemoryTarget::new();
    target
        .seed_index(
            "finance",
            "positions",
            ExistingIndex {
                name: "symbol_1_timestamp_-1".to_string(),
                keys: KeyPattern::new().asc("user_id"),
                unique: false,
                ttl_seconds: None,
            },
        )
        .unwrap();

    let mut manifest = builtin_manifest();
    manifest.collections = vec![builtin_manifest().collection("positions").unwrap().clone()];

    let report = provision(&target, &manifest, &secret()).await.unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, ProvisionErrorKind::Conflict);
    assert_eq!(
        failures[0].object,
        ObjectRef::index("finance", "positions", "symbol_1_timestamp_-1")
    );
}

/// Permission denial mid-run is recorded, not fatal.
#[tokio::test]
async fn test_permission_denied_mid_run() {
    let target = MemoryTarget::new();
    target.fail_indexes_on("a", TargetError::Unauthorized("not authorized on finance".into()));

    let report = provision(&target, &abc_manifest(), &secret()).await.unwrap();

    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].kind, ProvisionErrorKind::PermissionDenied);
    assert_eq!(report.collections_created(), 2);
}

/// The report serializes failures with their object and kind.
#[tokio::test]
async fn test_failure_json_shape() {
    let target = MemoryTarget::new();
    target.fail_indexes_on("b", TargetError::Connection("socket closed".into()));

    let report = provision(&target, &abc_manifest(), &secret()).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    let b = &json["collections"][1];
    assert_eq!(b["name"], "b");
    assert_eq!(b["errors"][0]["kind"], "connection");
    assert_eq!(b["errors"][0]["object"]["type"], "index");
    assert_eq!(b["errors"][0]["object"]["index"], "key_1");
    assert!(json["collections"][2].get("errors").is_none());
}

// =============================================================================
// Fail-Fast Policy
// =============================================================================

/// Fail-fast returns the first failure and leaves later collections alone.
#[tokio::test]
async fn test_fail_fast_aborts() {
    let target = MemoryTarget::new();
    target.fail_indexes_on("b", TargetError::Other("disk full".into()));

    let result = Provisioner::new(&target)
        .with_policy(FailurePolicy::FailFast)
        .provision(&abc_manifest(), &secret())
        .await;

    match result {
        Err(ProvisionFailure::Provision(error)) => {
            assert_eq!(error.object, ObjectRef::index("finance", "b", "key_1"));
        }
        other => panic!("expected fail-fast abort, got {:?}", other.map(|r| r.run_id)),
    }
    assert!(!target.collection_exists("finance", "c").await.unwrap());
}

/// Fail-fast behaves like isolate when nothing fails.
#[tokio::test]
async fn test_fail_fast_clean_run() {
    let target = MemoryTarget::new();

    let report = Provisioner::new(&target)
        .with_policy(FailurePolicy::FailFast)
        .provision(&abc_manifest(), &secret())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.collections_created(), 3);
}
