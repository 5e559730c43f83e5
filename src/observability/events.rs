//! Observable provisioning events
//!
//! Events are explicit and typed. Each maps to one stable log event name.

use std::fmt;

/// Observable events during a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Run begins
    ProvisionBegin,
    /// Run finished and produced a report
    ProvisionComplete,
    /// Run aborted without a report (FATAL)
    ProvisionAborted,

    // Inputs
    /// Configuration resolved
    ConfigLoaded,
    /// Manifest loaded and validated
    ManifestLoaded,

    // Authentication
    /// Admin session established
    AuthOk,
    /// Admin authentication failed (FATAL)
    AuthFailed,

    // Schema objects
    /// Target database selected
    DatabaseSelected,
    /// Application principal created
    PrincipalCreated,
    /// Application principal already present
    PrincipalExists,
    /// Collection created
    CollectionCreated,
    /// Collection already present
    CollectionExists,
    /// Index created
    IndexCreated,
    /// Equivalent index already present
    IndexExists,
    /// Existing index differs from the manifest in options
    IndexDrift,
    /// Object could not be reconciled
    ObjectFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ProvisionBegin => "PROVISION_BEGIN",
            Event::ProvisionComplete => "PROVISION_COMPLETE",
            Event::ProvisionAborted => "PROVISION_ABORTED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ManifestLoaded => "MANIFEST_LOADED",

            Event::AuthOk => "AUTH_OK",
            Event::AuthFailed => "AUTH_FAILED",

            Event::DatabaseSelected => "DATABASE_SELECTED",
            Event::PrincipalCreated => "PRINCIPAL_CREATED",
            Event::PrincipalExists => "PRINCIPAL_EXISTS",
            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::CollectionExists => "COLLECTION_EXISTS",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexExists => "INDEX_EXISTS",
            Event::IndexDrift => "INDEX_DRIFT",
            Event::ObjectFailed => "OBJECT_FAILED",
        }
    }

    /// Returns true if this event ends the run without a report
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ProvisionAborted | Event::AuthFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_events() {
        assert!(Event::AuthFailed.is_fatal());
        assert!(Event::ProvisionAborted.is_fatal());
        assert!(!Event::ObjectFailed.is_fatal());
        assert!(!Event::CollectionCreated.is_fatal());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::CollectionCreated.to_string(), "COLLECTION_CREATED");
        assert_eq!(Event::IndexDrift.as_str(), "INDEX_DRIFT");
    }
}
