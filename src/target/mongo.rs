//! MongoDB schema target
//!
//! Talks to a deployment through the official async driver. Driver-level
//! retryable reads and writes are turned off: a provisioning run surfaces
//! transient failures to the operator instead of retrying them.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential, IndexOptions};
use mongodb::{Client, IndexModel};

use crate::auth::{AdminCredentials, AdminSession, Privilege, Secret};
use crate::schema::{Grant, IndexSpec, KeyPattern, PrincipalSpec, SortDirection};

use super::errors::{TargetError, TargetResult};
use super::{ExistingIndex, SchemaTarget};

/// Server error codes the provisioner distinguishes.
mod codes {
    pub const UNAUTHORIZED: i32 = 13;
    pub const AUTHENTICATION_FAILED: i32 = 18;
    pub const HOST_UNREACHABLE: i32 = 6;
    pub const HOST_NOT_FOUND: i32 = 7;
    pub const NAMESPACE_NOT_FOUND: i32 = 26;
    pub const NAMESPACE_EXISTS: i32 = 48;
    pub const INDEX_ALREADY_EXISTS: i32 = 68;
    pub const INDEX_OPTIONS_CONFLICT: i32 = 85;
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
    pub const NETWORK_TIMEOUT: i32 = 89;
    pub const DUPLICATE_KEY: i32 = 11000;
    pub const SOCKET_EXCEPTION: i32 = 9001;
    pub const USER_ALREADY_EXISTS: i32 = 51003;
}

/// Connection settings for a MongoDB deployment.
#[derive(Debug, Clone)]
pub struct MongoSettings {
    /// Connection string, e.g. `mongodb://localhost:27017`
    pub uri: String,
    /// Database the admin credentials authenticate against
    pub auth_source: String,
    /// Reported to the server in the handshake
    pub app_name: String,
    /// Applies to connecting and to server selection
    pub connect_timeout: Duration,
}

/// MongoDB schema target
pub struct MongoTarget {
    client: Client,
}

impl MongoTarget {
    /// Builds a client for `settings` authenticating as `credentials`.
    ///
    /// The driver connects lazily; nothing is sent until `authenticate`.
    pub async fn connect(settings: &MongoSettings, credentials: &AdminCredentials) -> TargetResult<Self> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|e| TargetError::Connection(format!("invalid uri: {}", e)))?;

        options.app_name = Some(settings.app_name.clone());
        options.connect_timeout = Some(settings.connect_timeout);
        options.server_selection_timeout = Some(settings.connect_timeout);
        options.retry_reads = Some(false);
        options.retry_writes = Some(false);

        options.credential = Some(
            Credential::builder()
                .username(credentials.user.clone())
                .password(credentials.password.expose().to_string())
                .source(settings.auth_source.clone())
                .build(),
        );

        let client = Client::with_options(options)?;
        Ok(Self { client })
    }

    async fn command(&self, database: &str, command: Document) -> TargetResult<Document> {
        Ok(self.client.database(database).run_command(command, None).await?)
    }
}

#[async_trait]
impl SchemaTarget for MongoTarget {
    async fn authenticate(&self) -> TargetResult<AdminSession> {
        let status = self
            .command("admin", doc! { "connectionStatus": 1, "showPrivileges": true })
            .await?;
        let auth_info = status
            .get_document("authInfo")
            .map_err(|e| TargetError::Other(format!("connectionStatus reply: {}", e)))?;

        let user = auth_info
            .get_array("authenticatedUsers")
            .ok()
            .and_then(|users| users.iter().filter_map(Bson::as_document).next())
            .and_then(|user| user.get_str("user").ok())
            .ok_or_else(|| TargetError::Authentication("no authenticated user".to_string()))?
            .to_string();

        let roles: Vec<Grant> = auth_info
            .get_array("authenticatedUserRoles")
            .map(|roles| roles.iter().filter_map(Bson::as_document).filter_map(grant_from).collect())
            .unwrap_or_default();

        let privileges: Vec<Privilege> = auth_info
            .get_array("authenticatedUserPrivileges")
            .map(|privileges| {
                privileges
                    .iter()
                    .filter_map(Bson::as_document)
                    .filter_map(privilege_from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AdminSession::new(user, roles).with_privileges(privileges))
    }

    async fn principal_exists(&self, database: &str, name: &str) -> TargetResult<bool> {
        let reply = self.command(database, doc! { "usersInfo": name }).await?;
        Ok(reply
            .get_array("users")
            .map(|users| !users.is_empty())
            .unwrap_or(false))
    }

    async fn create_principal(
        &self,
        database: &str,
        principal: &PrincipalSpec,
        password: &Secret,
    ) -> TargetResult<()> {
        let roles: Vec<Bson> = principal
            .grants
            .iter()
            .map(|g| Bson::Document(doc! { "role": g.role.as_str(), "db": g.db.as_str() }))
            .collect();

        self.command(
            database,
            doc! {
                "createUser": principal.name.as_str(),
                "pwd": password.expose(),
                "roles": roles,
            },
        )
        .await?;
        Ok(())
    }

    async fn collection_exists(&self, database: &str, collection: &str) -> TargetResult<bool> {
        let names = self
            .client
            .database(database)
            .list_collection_names(doc! { "name": collection })
            .await?;
        Ok(names.iter().any(|n| n == collection))
    }

    async fn create_collection(&self, database: &str, collection: &str) -> TargetResult<()> {
        self.client
            .database(database)
            .create_collection(collection, None)
            .await?;
        Ok(())
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> TargetResult<Vec<ExistingIndex>> {
        let cursor = match self
            .client
            .database(database)
            .collection::<Document>(collection)
            .list_indexes(None)
            .await
        {
            Ok(cursor) => cursor,
            Err(e) if command_code(&e) == Some(codes::NAMESPACE_NOT_FOUND) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let models: Vec<IndexModel> = cursor.try_collect().await?;
        Ok(models.iter().filter_map(existing_from).collect())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> TargetResult<String> {
        let mut options = IndexOptions::default();
        options.name = Some(index.effective_name());
        options.unique = index.unique.then_some(true);
        options.background = index.background.then_some(true);
        options.expire_after = index.ttl_seconds.map(Duration::from_secs);

        let model = IndexModel::builder()
            .keys(key_document(&index.keys))
            .options(options)
            .build();

        let result = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .create_index(model, None)
            .await?;
        Ok(result.index_name)
    }
}

fn key_document(keys: &KeyPattern) -> Document {
    let mut document = Document::new();
    for (field, direction) in keys.fields() {
        document.insert(field.as_str(), direction.as_i32());
    }
    document
}

fn grant_from(role: &Document) -> Option<Grant> {
    Some(Grant::new(role.get_str("role").ok()?, role.get_str("db").ok()?))
}

/// Converts a privilege document. Only database-wide resources are kept:
/// `{db: "", collection: ""}` and `anyResource` cover every database,
/// `{db: name, collection: ""}` covers one.
fn privilege_from(privilege: &Document) -> Option<Privilege> {
    let resource = privilege.get_document("resource").ok()?;
    let actions: Vec<&str> = privilege
        .get_array("actions")
        .ok()?
        .iter()
        .filter_map(Bson::as_str)
        .collect();

    if resource.get_bool("anyResource").unwrap_or(false) {
        return Some(Privilege::any_database(&actions));
    }
    if !resource.get_str("collection").ok()?.is_empty() {
        return None;
    }
    match resource.get_str("db").ok()? {
        "" => Some(Privilege::any_database(&actions)),
        db => Some(Privilege::on(db, &actions)),
    }
}

/// Converts a listed index. Indexes with non-directional keys (text,
/// hashed, geo) cannot match a manifest index and are skipped.
fn existing_from(model: &IndexModel) -> Option<ExistingIndex> {
    let mut keys = KeyPattern::new();
    for (field, value) in &model.keys {
        let number = match value {
            Bson::Int32(n) => i64::from(*n),
            Bson::Int64(n) => *n,
            Bson::Double(n) if n.fract() == 0.0 => *n as i64,
            _ => return None,
        };
        keys = keys.with(field.as_str(), SortDirection::from_i64(number)?);
    }

    let options = model.options.as_ref();
    Some(ExistingIndex {
        name: options
            .and_then(|o| o.name.clone())
            .unwrap_or_else(|| keys.default_index_name()),
        unique: options.and_then(|o| o.unique).unwrap_or(false),
        ttl_seconds: options.and_then(|o| o.expire_after).map(|d| d.as_secs()),
        keys,
    })
}

fn command_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => Some(concern.code),
        _ => None,
    }
}

impl From<MongoError> for TargetError {
    fn from(err: MongoError) -> Self {
        let message = err.to_string();

        if let Some(code) = command_code(&err) {
            return match code {
                codes::NAMESPACE_EXISTS | codes::INDEX_ALREADY_EXISTS | codes::USER_ALREADY_EXISTS => {
                    TargetError::AlreadyExists(message)
                }
                codes::INDEX_OPTIONS_CONFLICT | codes::INDEX_KEY_SPECS_CONFLICT => {
                    TargetError::Conflict(message)
                }
                codes::DUPLICATE_KEY => TargetError::DuplicateKey(message),
                codes::UNAUTHORIZED => TargetError::Unauthorized(message),
                codes::AUTHENTICATION_FAILED => TargetError::Authentication(message),
                codes::HOST_UNREACHABLE
                | codes::HOST_NOT_FOUND
                | codes::NETWORK_TIMEOUT
                | codes::SOCKET_EXCEPTION => TargetError::Connection(message),
                _ => TargetError::Other(message),
            };
        }

        match err.kind.as_ref() {
            ErrorKind::Authentication { .. } => TargetError::Authentication(message),
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => TargetError::Connection(message),
            _ => TargetError::Other(message),
        }
    }
}
