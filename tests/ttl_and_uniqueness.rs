//! TTL and Uniqueness Tests
//!
//! Provisioned indexes must behave as declared:
//! - A TTL index makes documents older than its threshold expire
//! - A unique index rejects the second insert of a key tuple
//! - `minute_bars` ends up with exactly the declared secondary indexes

use chrono::{Duration, Utc};
use schema_provisioner::auth::Secret;
use schema_provisioner::provision::provision;
use schema_provisioner::schema::{
    builtin_manifest, CollectionSpec, IndexSpec, KeyPattern, SchemaManifest,
    MINUTE_BAR_RETENTION_SECONDS,
};
use schema_provisioner::target::{MemoryTarget, SchemaTarget, TargetError};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

/// `minute_bars` with a unique `(symbol, datetime)` index and a TTL on
/// `datetime`.
fn minute_bars_manifest() -> SchemaManifest {
    let mut manifest = builtin_manifest();
    manifest.collections = vec![CollectionSpec::new("minute_bars")
        .index(
            IndexSpec::new(KeyPattern::new().asc("symbol").asc("datetime"))
                .unique()
                .background(),
        )
        .index(
            IndexSpec::new(KeyPattern::new().asc("datetime"))
                .ttl(MINUTE_BAR_RETENTION_SECONDS)
                .background(),
        )];
    manifest
}

async fn provisioned(manifest: &SchemaManifest) -> MemoryTarget {
    let target = MemoryTarget::new();
    let report = provision(&target, manifest, &Secret::new("pw")).await.unwrap();
    assert!(report.is_success());
    target
}

fn bar(id: u32, symbol: &str, age_days: i64) -> serde_json::Value {
    let datetime = Utc::now() - Duration::days(age_days);
    json!({
        "_id": id,
        "symbol": symbol,
        "datetime": datetime.to_rfc3339(),
        "close": 101.5,
    })
}

// =============================================================================
// Scenario
// =============================================================================

/// Exactly two non-`_id` indexes, matching the declared patterns and options.
#[tokio::test]
async fn test_minute_bars_indexes() {
    let manifest = minute_bars_manifest();
    let target = provisioned(&manifest).await;

    let indexes: Vec<_> = target
        .list_indexes("finance", "minute_bars")
        .await
        .unwrap()
        .into_iter()
        .filter(|i| !i.is_primary())
        .collect();

    assert_eq!(indexes.len(), 2);

    let unique = indexes.iter().find(|i| i.name == "symbol_1_datetime_1").unwrap();
    assert_eq!(unique.keys, KeyPattern::new().asc("symbol").asc("datetime"));
    assert!(unique.unique);
    assert_eq!(unique.ttl_seconds, None);

    let ttl = indexes.iter().find(|i| i.name == "datetime_1").unwrap();
    assert_eq!(ttl.keys, KeyPattern::new().asc("datetime"));
    assert!(!ttl.unique);
    assert_eq!(ttl.ttl_seconds, Some(7_776_000));
}

// =============================================================================
// TTL
// =============================================================================

/// Documents older than 90 days expire; newer ones stay.
#[tokio::test]
async fn test_ttl_expires_old_documents() {
    let target = provisioned(&minute_bars_manifest()).await;

    target.insert("finance", "minute_bars", bar(1, "AAPL", 91)).unwrap();
    target.insert("finance", "minute_bars", bar(2, "AAPL", 89)).unwrap();
    target.insert("finance", "minute_bars", bar(3, "MSFT", 1)).unwrap();

    let removed = target.expire(Utc::now()).unwrap();

    assert_eq!(removed, 1);
    assert_eq!(target.document_count("finance", "minute_bars").unwrap(), 2);
}

/// Nothing expires without a TTL index.
#[tokio::test]
async fn test_no_ttl_index_no_expiry() {
    let mut manifest = minute_bars_manifest();
    manifest.collections[0].indexes.truncate(1);
    let target = provisioned(&manifest).await;

    target.insert("finance", "minute_bars", bar(1, "AAPL", 365)).unwrap();

    assert_eq!(target.expire(Utc::now()).unwrap(), 0);
    assert_eq!(target.document_count("finance", "minute_bars").unwrap(), 1);
}

/// Expiry is relative to the sweep time.
#[tokio::test]
async fn test_ttl_threshold_moves_with_clock() {
    let target = provisioned(&minute_bars_manifest()).await;
    target.insert("finance", "minute_bars", bar(1, "AAPL", 60)).unwrap();

    assert_eq!(target.expire(Utc::now()).unwrap(), 0);
    assert_eq!(target.expire(Utc::now() + Duration::days(31)).unwrap(), 1);
}

// =============================================================================
// Uniqueness
// =============================================================================

/// The second insert of a `(symbol, datetime)` tuple is rejected.
#[tokio::test]
async fn test_unique_index_rejects_duplicate() {
    let target = provisioned(&minute_bars_manifest()).await;
    let datetime = "2024-01-02T14:30:00+00:00";

    target
        .insert(
            "finance",
            "minute_bars",
            json!({"_id": 1, "symbol": "AAPL", "datetime": datetime}),
        )
        .unwrap();
    let err = target
        .insert(
            "finance",
            "minute_bars",
            json!({"_id": 2, "symbol": "AAPL", "datetime": datetime}),
        )
        .unwrap_err();

    assert!(matches!(err, TargetError::DuplicateKey(_)));
    target
        .insert(
            "finance",
            "minute_bars",
            json!({"_id": 3, "symbol": "MSFT", "datetime": datetime}),
        )
        .unwrap();
    assert_eq!(target.document_count("finance", "minute_bars").unwrap(), 2);
}

/// Built-in unique indexes hold across collections.
#[tokio::test]
async fn test_builtin_unique_indexes() {
    let target = provisioned(&builtin_manifest()).await;

    let doc = json!({"_id": 1, "symbol": "AAPL", "strategy_key": "ma_cross", "user_id": "u1"});
    target.insert("finance", "watchlist_strategies", doc).unwrap();
    let dup = json!({"_id": 2, "symbol": "AAPL", "strategy_key": "ma_cross", "user_id": "u1"});
    assert!(target.insert("finance", "watchlist_strategies", dup).is_err());

    target
        .insert("finance", "runtime_status", json!({"_id": 1, "symbol": "AAPL"}))
        .unwrap();
    assert!(target
        .insert("finance", "runtime_status", json!({"_id": 2, "symbol": "AAPL"}))
        .is_err());
}
