//! Manifest Invariant Tests
//!
//! Manifests are checked before any connection is opened:
//! - Collection names are unique and non-empty
//! - Index key patterns are non-empty and unique per collection
//! - At most one TTL index per collection, on a single field
//! - Key patterns keep their declared order through a save/load cycle

use schema_provisioner::auth::CredentialRef;
use schema_provisioner::schema::{
    builtin_manifest, CollectionSpec, Grant, IndexSpec, KeyPattern, ManifestLoader,
    ManifestValidator, PrincipalSpec, SchemaErrorCode, SchemaManifest,
};
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn manifest_with(collections: Vec<CollectionSpec>) -> SchemaManifest {
    SchemaManifest {
        database: "finance".into(),
        principal: PrincipalSpec {
            name: "quant_user".into(),
            credential: CredentialRef::env("QUANT_USER_PASSWORD"),
            grants: vec![Grant::new("readWrite", "finance")],
        },
        collections,
    }
}

fn codes(manifest: &SchemaManifest) -> Vec<SchemaErrorCode> {
    ManifestValidator::violations(manifest)
        .iter()
        .map(|e| e.code())
        .collect()
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_builtin_manifest_is_valid() {
    let manifest = builtin_manifest();
    assert!(ManifestValidator::validate(&manifest).is_ok());
    assert_eq!(manifest.collections.len(), 8);
    assert_eq!(manifest.index_count(), 16);
}

#[test]
fn test_duplicate_collection_rejected() {
    let manifest = manifest_with(vec![
        CollectionSpec::new("positions"),
        CollectionSpec::new("positions"),
    ]);
    assert_eq!(codes(&manifest), vec![SchemaErrorCode::DuplicateCollection]);
}

#[test]
fn test_empty_key_pattern_rejected() {
    let manifest = manifest_with(vec![
        CollectionSpec::new("positions").index(IndexSpec::new(KeyPattern::new()))
    ]);
    assert_eq!(codes(&manifest), vec![SchemaErrorCode::InvalidKeyPattern]);
}

#[test]
fn test_repeated_key_pattern_rejected() {
    let keys = KeyPattern::new().asc("symbol").desc("timestamp");
    let manifest = manifest_with(vec![CollectionSpec::new("positions")
        .index(IndexSpec::new(keys.clone()))
        .index(IndexSpec::new(keys).unique())]);
    assert_eq!(codes(&manifest), vec![SchemaErrorCode::DuplicateIndex]);
}

#[test]
fn test_second_ttl_index_rejected() {
    let manifest = manifest_with(vec![CollectionSpec::new("minute_bars")
        .index(IndexSpec::new(KeyPattern::new().asc("datetime")).ttl(60))
        .index(IndexSpec::new(KeyPattern::new().asc("created_at")).ttl(60))]);
    assert_eq!(codes(&manifest), vec![SchemaErrorCode::InvalidTtl]);
}

#[test]
fn test_compound_ttl_rejected() {
    let manifest = manifest_with(vec![CollectionSpec::new("minute_bars").index(
        IndexSpec::new(KeyPattern::new().asc("symbol").asc("datetime")).ttl(60),
    )]);
    assert_eq!(codes(&manifest), vec![SchemaErrorCode::InvalidTtl]);
}

/// Every violation is reported, in manifest order.
#[test]
fn test_all_violations_reported() {
    let manifest = manifest_with(vec![
        CollectionSpec::new(""),
        CollectionSpec::new("a").index(IndexSpec::new(KeyPattern::new())),
    ]);
    let violations = ManifestValidator::violations(&manifest);

    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].code(), SchemaErrorCode::InvalidName);
    assert_eq!(violations[1].collection(), Some("a"));
    assert_eq!(
        ManifestValidator::validate(&manifest).unwrap_err().code(),
        SchemaErrorCode::InvalidName
    );
}

#[test]
fn test_validation_is_deterministic() {
    let manifest = manifest_with(vec![CollectionSpec::new("a"), CollectionSpec::new("a")]);
    let first: Vec<String> = ManifestValidator::violations(&manifest)
        .iter()
        .map(|e| e.to_string())
        .collect();
    for _ in 0..50 {
        let again: Vec<String> = ManifestValidator::violations(&manifest)
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(first, again);
    }
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn test_save_and_load_preserves_key_order() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manifest.json");
    let manifest = builtin_manifest();

    ManifestLoader::save(&manifest, &path).unwrap();
    let loaded = ManifestLoader::load(&path).unwrap();

    assert_eq!(loaded, manifest);
    assert_eq!(ManifestLoader::digest(&loaded), ManifestLoader::digest(&manifest));

    let content = fs::read_to_string(&path).unwrap();
    let symbol = content.find("\"symbol\"").unwrap();
    let datetime = content.find("\"datetime\"").unwrap();
    assert!(symbol < datetime);
}

#[test]
fn test_invalid_manifest_file_not_loaded() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manifest.json");
    let manifest = manifest_with(vec![CollectionSpec::new("a"), CollectionSpec::new("a")]);
    ManifestLoader::save(&manifest, &path).unwrap();

    let err = ManifestLoader::load(&path).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::DuplicateCollection);
    assert!(ManifestLoader::parse_file(&path).is_ok());
}

#[test]
fn test_handwritten_manifest() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manifest.json");
    fs::write(
        &path,
        r#"{
            "database": "research",
            "principal": {
                "name": "analyst",
                "credential": {"env": "ANALYST_PASSWORD"},
                "grants": [{"role": "readWrite", "db": "research"}]
            },
            "collections": [
                {
                    "name": "ticks",
                    "indexes": [
                        {"keys": {"symbol": 1, "ts": -1}, "unique": true},
                        {"keys": {"ts": 1}, "ttl_seconds": 86400}
                    ]
                }
            ]
        }"#,
    )
    .unwrap();

    let manifest = ManifestLoader::load(&path).unwrap();
    let ticks = manifest.collection("ticks").unwrap();

    assert_eq!(ticks.indexes[0].effective_name(), "symbol_1_ts_-1");
    assert!(ticks.indexes[0].unique);
    assert_eq!(ticks.ttl_index().unwrap().ttl_seconds, Some(86_400));
    assert_eq!(manifest.principal.credential, CredentialRef::env("ANALYST_PASSWORD"));
}

#[test]
fn test_malformed_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manifest.json");
    fs::write(&path, "{ not json").unwrap();

    let err = ManifestLoader::load(&path).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::Malformed);
}
