//! Manifest loader
//!
//! Manifests are JSON files. A loaded manifest is validated before it is
//! returned; a manifest that fails validation never reaches the provisioner.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::builtin::builtin_manifest;
use super::errors::{SchemaError, SchemaResult};
use super::types::SchemaManifest;
use super::validator::ManifestValidator;

/// Loads and saves manifest files.
pub struct ManifestLoader;

impl ManifestLoader {
    /// Loads the manifest at `path`, or the built-in manifest when `None`.
    pub fn load_or_builtin(path: Option<&Path>) -> SchemaResult<SchemaManifest> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let manifest = builtin_manifest();
                ManifestValidator::validate(&manifest)?;
                Ok(manifest)
            }
        }
    }

    /// Loads and validates a manifest file.
    pub fn load(path: &Path) -> SchemaResult<SchemaManifest> {
        let manifest = Self::parse_file(path)?;
        ManifestValidator::validate(&manifest)?;
        Ok(manifest)
    }

    /// Parses a manifest file without validating it.
    ///
    /// Used by `validate`, which wants every violation rather than the first.
    pub fn parse_file(path: &Path) -> SchemaResult<SchemaManifest> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        Self::parse_str(&content)
            .map_err(|e| SchemaError::malformed(path.display().to_string(), e.to_string()))
    }

    /// Parses manifest JSON.
    pub fn parse_str(content: &str) -> Result<SchemaManifest, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Writes a manifest as pretty JSON, replacing any existing file.
    pub fn save(manifest: &SchemaManifest, path: &Path) -> SchemaResult<PathBuf> {
        let content = Self::to_json(manifest).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to serialize manifest: {}", e),
            )
        })?;

        fs::write(path, content).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })?;

        Ok(path.to_path_buf())
    }

    /// Canonical pretty JSON of a manifest.
    pub fn to_json(manifest: &SchemaManifest) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(manifest)
    }

    /// SHA-256 of the manifest's compact JSON, hex encoded.
    ///
    /// Identifies which manifest a report was produced from.
    pub fn digest(manifest: &SchemaManifest) -> String {
        // Serializing plain structs and strings into a Vec cannot fail.
        let bytes = serde_json::to_vec(manifest).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }
}
