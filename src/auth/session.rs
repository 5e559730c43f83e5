//! # Admin Session
//!
//! The authenticated identity behind a provisioning run, the roles the
//! server reports for it, and the privileges those roles resolve to
//! (inherited roles included). Privilege checks happen here, before any
//! schema object is touched.

use serde::{Deserialize, Serialize};

use crate::schema::{Grant, SchemaManifest};

use super::errors::{AuthError, AuthResult};

/// Roles that cover every database.
const SUPERUSER_ROLES: &[&str] = &["root", "__system"];

/// Roles allowing collection and index creation.
const SCHEMA_ROLES: &[&str] = &["dbOwner", "dbAdmin", "readWrite"];
const SCHEMA_ANY_DATABASE_ROLES: &[&str] = &["dbAdminAnyDatabase", "readWriteAnyDatabase"];

/// Roles allowing user creation and role granting.
const USER_ADMIN_ROLES: &[&str] = &["dbOwner", "userAdmin"];
const USER_ADMIN_ANY_DATABASE_ROLES: &[&str] = &["userAdminAnyDatabase"];

/// Actions needed to create collections and indexes.
const SCHEMA_ACTIONS: &[&str] = &["createCollection", "createIndex"];

/// Actions needed to create users and grant them roles.
const USER_ADMIN_ACTIONS: &[&str] = &["createUser", "grantRole"];

/// Actions allowed on one database, or on every database when `db` is
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub db: Option<String>,
    pub actions: Vec<String>,
}

impl Privilege {
    pub fn on(db: impl Into<String>, actions: &[&str]) -> Self {
        Self {
            db: Some(db.into()),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn any_database(actions: &[&str]) -> Self {
        Self {
            db: None,
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn allows(&self, db: &str, action: &str) -> bool {
        self.db.as_deref().map_or(true, |own| own == db)
            && self.actions.iter().any(|a| a == action || a == "anyAction")
    }
}

/// Authenticated administrative session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    /// Authenticated user name
    pub user: String,
    /// Roles held, as reported by the server
    pub roles: Vec<Grant>,
    /// Database-wide privileges the roles resolve to
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

impl AdminSession {
    pub fn new(user: impl Into<String>, roles: Vec<Grant>) -> Self {
        Self {
            user: user.into(),
            roles,
            privileges: Vec::new(),
        }
    }

    pub fn with_privileges(mut self, privileges: Vec<Privilege>) -> Self {
        self.privileges = privileges;
        self
    }

    /// A session holding `root` on `admin`.
    pub fn superuser(user: impl Into<String>) -> Self {
        Self::new(user, vec![Grant::new("root", "admin")])
    }

    fn holds(&self, db: &str, scoped: &[&str], any_database: &[&str]) -> bool {
        self.roles.iter().any(|grant| {
            SUPERUSER_ROLES.contains(&grant.role.as_str())
                || any_database.contains(&grant.role.as_str())
                || (grant.db == db && scoped.contains(&grant.role.as_str()))
        })
    }

    fn allows(&self, db: &str, actions: &[&str]) -> bool {
        actions
            .iter()
            .all(|action| self.privileges.iter().any(|p| p.allows(db, action)))
    }

    /// Whether collections and indexes can be created in `db`.
    pub fn can_manage_schema(&self, db: &str) -> bool {
        self.holds(db, SCHEMA_ROLES, SCHEMA_ANY_DATABASE_ROLES) || self.allows(db, SCHEMA_ACTIONS)
    }

    /// Whether users can be created in, and roles granted on, `db`.
    pub fn can_manage_users(&self, db: &str) -> bool {
        self.holds(db, USER_ADMIN_ROLES, USER_ADMIN_ANY_DATABASE_ROLES)
            || self.allows(db, USER_ADMIN_ACTIONS)
    }

    /// Whether `db` is fully administered by this session.
    pub fn can_administer(&self, db: &str) -> bool {
        self.can_manage_schema(db) && self.can_manage_users(db)
    }

    /// Checks the session covers everything `manifest` will do.
    ///
    /// The target database must be administered, and every grant handed to
    /// the principal must be on a database where this session can grant roles.
    pub fn authorize(&self, manifest: &SchemaManifest) -> AuthResult<()> {
        if !self.can_administer(&manifest.database) {
            return Err(AuthError::InsufficientPrivileges {
                user: self.user.clone(),
                database: manifest.database.clone(),
            });
        }

        for grant in &manifest.principal.grants {
            if !self.can_manage_users(&grant.db) {
                return Err(AuthError::GrantOutOfScope {
                    user: self.user.clone(),
                    grant: grant.to_string(),
                });
            }
        }

        Ok(())
    }
}
