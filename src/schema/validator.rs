//! Manifest validator
//!
//! Checks run before any connection is opened:
//! - Database and collection names are acceptable to the engine
//! - Collection names are unique
//! - Within a collection, key patterns and explicit index names are unique
//! - Key patterns are non-empty and name each field once
//! - At most one TTL index per collection, single-field, not on `_id`
//! - The principal is usable (name, credential reference, grants)
//!
//! The validator reports every violation it finds, not just the first, so
//! an operator can fix a manifest in one pass.

use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};
use super::types::{CollectionSpec, PrincipalSpec, SchemaManifest};

/// Longest database name the engine accepts, in bytes.
const MAX_DATABASE_NAME_BYTES: usize = 63;

/// Characters the engine rejects in database names.
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '\0'];

/// Validates manifests. Stateless.
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validates a manifest, returning the first violation.
    pub fn validate(manifest: &SchemaManifest) -> SchemaResult<()> {
        match Self::violations(manifest).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns every violation in manifest order.
    pub fn violations(manifest: &SchemaManifest) -> Vec<SchemaError> {
        let mut errors = Vec::new();

        Self::check_database_name(&manifest.database, &mut errors);
        Self::check_principal(&manifest.principal, &mut errors);

        let mut seen = HashSet::new();
        for collection in &manifest.collections {
            if !seen.insert(collection.name.as_str()) {
                errors.push(SchemaError::duplicate_collection(&collection.name));
            }
            Self::check_collection(collection, &mut errors);
        }

        errors
    }

    fn check_database_name(name: &str, errors: &mut Vec<SchemaError>) {
        if name.is_empty() {
            errors.push(SchemaError::invalid_database_name(name, "must not be empty"));
            return;
        }
        if name.len() > MAX_DATABASE_NAME_BYTES {
            errors.push(SchemaError::invalid_database_name(
                name,
                "exceeds 63 bytes",
            ));
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
            errors.push(SchemaError::invalid_database_name(
                name,
                &format!("contains forbidden character {:?}", c),
            ));
        }
    }

    fn check_principal(principal: &PrincipalSpec, errors: &mut Vec<SchemaError>) {
        if principal.name.trim().is_empty() {
            errors.push(SchemaError::invalid_principal("Principal name must not be empty"));
        }
        if principal.credential.env.trim().is_empty() {
            errors.push(SchemaError::invalid_principal(
                "Principal credential must name an environment variable",
            ));
        }
        if principal.grants.is_empty() {
            errors.push(SchemaError::invalid_principal(format!(
                "Principal '{}' must have at least one grant",
                principal.name
            )));
        }
        for grant in &principal.grants {
            if grant.role.trim().is_empty() || grant.db.trim().is_empty() {
                errors.push(SchemaError::invalid_principal(format!(
                    "Grant '{}' must name both a role and a database",
                    grant
                )));
            }
        }
    }

    fn check_collection(collection: &CollectionSpec, errors: &mut Vec<SchemaError>) {
        let name = collection.name.as_str();

        if name.is_empty() {
            errors.push(SchemaError::invalid_collection_name(name, "must not be empty"));
        } else if name.starts_with("system.") {
            errors.push(SchemaError::invalid_collection_name(
                name,
                "uses the reserved 'system.' prefix",
            ));
        } else if name.contains('$') || name.contains('\0') {
            errors.push(SchemaError::invalid_collection_name(
                name,
                "contains '$' or NUL",
            ));
        }

        let mut patterns = HashSet::new();
        let mut names = HashSet::new();
        let mut ttl_count = 0;

        for index in &collection.indexes {
            if index.keys.is_empty() {
                errors.push(SchemaError::invalid_key_pattern(
                    name,
                    "Index key pattern must not be empty",
                ));
                continue;
            }

            let mut fields = HashSet::new();
            for field in index.keys.field_names() {
                if field.is_empty() {
                    errors.push(SchemaError::invalid_key_pattern(
                        name,
                        format!("Key pattern {} contains an empty field name", index.keys),
                    ));
                } else if !fields.insert(field) {
                    errors.push(SchemaError::invalid_key_pattern(
                        name,
                        format!("Field '{}' repeats in key pattern {}", field, index.keys),
                    ));
                }
            }

            if !patterns.insert(&index.keys) {
                errors.push(SchemaError::duplicate_index(name, index.keys.to_string()));
            }
            if let Some(ref explicit) = index.name {
                if !names.insert(explicit.as_str()) {
                    errors.push(SchemaError::duplicate_index(name, format!("'{}'", explicit)));
                }
            }

            if let Some(ttl) = index.ttl_seconds {
                ttl_count += 1;
                if index.keys.len() != 1 {
                    errors.push(SchemaError::invalid_ttl(
                        name,
                        format!("TTL index {} must cover exactly one field", index.keys),
                    ));
                }
                if index.keys.field_names().any(|f| f == "_id") {
                    errors.push(SchemaError::invalid_ttl(
                        name,
                        "TTL index cannot be declared on '_id'",
                    ));
                }
                if ttl > i32::MAX as u64 {
                    errors.push(SchemaError::invalid_ttl(
                        name,
                        format!("ttl_seconds {} exceeds {}", ttl, i32::MAX),
                    ));
                }
            }
        }

        if ttl_count > 1 {
            errors.push(SchemaError::invalid_ttl(
                name,
                format!("{} TTL indexes declared, at most one is allowed", ttl_count),
            ));
        }
    }
}
