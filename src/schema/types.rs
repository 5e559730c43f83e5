//! Manifest type definitions
//!
//! A manifest describes the desired end state of one database:
//! - one application principal with scoped grants
//! - an ordered list of collections, each with its indexes
//!
//! Key patterns are ordered. JSON objects are read and written in document
//! order so `{"symbol": 1, "datetime": 1}` and `{"datetime": 1, "symbol": 1}`
//! stay distinct indexes.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::auth::CredentialRef;

/// Sort direction of one indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Numeric form used by the engine (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// Parses the numeric form. Anything other than `1` / `-1` is rejected.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(SortDirection::Ascending),
            -1 => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        SortDirection::from_i64(value).ok_or_else(|| {
            de::Error::custom(format!("index direction must be 1 or -1, got {}", value))
        })
    }
}

/// Ordered field → direction mapping of a compound or single-field index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    fields: Vec<(String, SortDirection)>,
}

impl KeyPattern {
    /// Creates an empty key pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field (builder style).
    pub fn with(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    /// Appends an ascending field.
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.with(field, SortDirection::Ascending)
    }

    /// Appends a descending field.
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.with(field, SortDirection::Descending)
    }

    pub fn fields(&self) -> &[(String, SortDirection)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declared order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Engine default index name: `field_dir` pairs joined with `_`.
    pub fn default_index_name(&self) -> String {
        self.fields
            .iter()
            .map(|(field, dir)| format!("{}_{}", field, dir.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl FromIterator<(String, SortDirection)> for KeyPattern {
    fn from_iter<I: IntoIterator<Item = (String, SortDirection)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, dir)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, dir.as_i32())?;
        }
        write!(f, "}}")
    }
}

impl Serialize for KeyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, dir) in &self.fields {
            map.serialize_entry(field, dir)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyPatternVisitor;

        impl<'de> Visitor<'de> for KeyPatternVisitor {
            type Value = KeyPattern;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping field names to 1 or -1")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<KeyPattern, A::Error> {
                let mut fields = Vec::new();
                while let Some((field, dir)) = access.next_entry::<String, SortDirection>()? {
                    fields.push((field, dir));
                }
                Ok(KeyPattern { fields })
            }
        }

        deserializer.deserialize_map(KeyPatternVisitor)
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Indexed fields in order
    pub keys: KeyPattern,
    /// Reject writes producing a duplicate key tuple
    #[serde(default)]
    pub unique: bool,
    /// Expire documents whose indexed timestamp is older than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Advisory non-blocking build hint, passed through to the engine
    #[serde(default)]
    pub background: bool,
    /// Explicit index name; engine default naming when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IndexSpec {
    /// Creates a plain, non-unique index over `keys`.
    pub fn new(keys: KeyPattern) -> Self {
        Self {
            keys,
            unique: false,
            ttl_seconds: None,
            background: false,
            name: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name the engine will give this index.
    pub fn effective_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.keys.default_index_name())
    }

    pub fn is_ttl(&self) -> bool {
        self.ttl_seconds.is_some()
    }
}

/// Collection definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// The TTL index, if one is declared.
    pub fn ttl_index(&self) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.is_ttl())
    }
}

/// One permission grant: a role scoped to a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub role: String,
    pub db: String,
}

impl Grant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.db)
    }
}

/// Application principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSpec {
    pub name: String,
    /// Where the password comes from. Never a literal.
    pub credential: CredentialRef,
    pub grants: Vec<Grant>,
}

/// Complete desired state of one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub database: String,
    pub principal: PrincipalSpec,
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
}

impl SchemaManifest {
    /// Looks up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Total number of declared indexes.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index_name() {
        let keys = KeyPattern::new().asc("symbol").desc("timestamp");
        assert_eq!(keys.default_index_name(), "symbol_1_timestamp_-1");
    }

    #[test]
    fn test_key_pattern_preserves_order() {
        let json = r#"{"symbol": 1, "datetime": -1, "alpha": 1}"#;
        let keys: KeyPattern = serde_json::from_str(json).unwrap();
        let names: Vec<_> = keys.field_names().collect();
        assert_eq!(names, vec!["symbol", "datetime", "alpha"]);

        let out = serde_json::to_string(&keys).unwrap();
        assert_eq!(out, r#"{"symbol":1,"datetime":-1,"alpha":1}"#);
    }

    #[test]
    fn test_key_pattern_rejects_bad_direction() {
        let result: Result<KeyPattern, _> = serde_json::from_str(r#"{"symbol": 2}"#);
        assert!(result.is_err());

        let result: Result<KeyPattern, _> = serde_json::from_str(r#"{"symbol": "text"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_key_pattern_equality_is_ordered() {
        let a = KeyPattern::new().asc("a").asc("b");
        let b = KeyPattern::new().asc("b").asc("a");
        assert_ne!(a, b);
    }

    #[test]
    fn test_index_spec_defaults_from_json() {
        let spec: IndexSpec = serde_json::from_str(r#"{"keys": {"order_id": 1}}"#).unwrap();
        assert!(!spec.unique);
        assert!(!spec.background);
        assert_eq!(spec.ttl_seconds, None);
        assert_eq!(spec.effective_name(), "order_id_1");
    }

    #[test]
    fn test_explicit_name_wins() {
        let spec = IndexSpec::new(KeyPattern::new().asc("datetime"))
            .ttl(60)
            .named("bars_expiry");
        assert_eq!(spec.effective_name(), "bars_expiry");
        assert!(spec.is_ttl());
    }

    #[test]
    fn test_key_pattern_display() {
        let keys = KeyPattern::new().asc("status").desc("updated_at");
        assert_eq!(keys.to_string(), "{status: 1, updated_at: -1}");
    }

    #[test]
    fn test_grant_display() {
        assert_eq!(Grant::new("readWrite", "finance").to_string(), "readWrite@finance");
    }
}
