//! Configuration file
//!
//! JSON, every field optional. Secrets are never stored here: the file only
//! names the environment variables that hold the admin credentials.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AdminCredentials, AuthResult};
use crate::target::MongoSettings;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Connection string (default `mongodb://localhost:27017`)
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database the admin user authenticates against (default `admin`)
    #[serde(default = "default_auth_source")]
    pub auth_source: String,

    /// Variable holding the admin user name
    #[serde(default = "default_admin_user_env")]
    pub admin_user_env: String,

    /// Variable holding the admin password
    #[serde(default = "default_admin_password_env")]
    pub admin_password_env: String,

    /// Application name sent in the connection handshake
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Connect and server-selection timeout in seconds (default 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_auth_source() -> String {
    "admin".to_string()
}
fn default_admin_user_env() -> String {
    "MONGO_INITDB_ROOT_USERNAME".to_string()
}
fn default_admin_password_env() -> String {
    "MONGO_INITDB_ROOT_PASSWORD".to_string()
}
fn default_app_name() -> String {
    "schema-provisioner".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            auth_source: default_auth_source(),
            admin_user_env: default_admin_user_env(),
            admin_password_env: default_admin_password_env(),
            app_name: default_app_name(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Replaces the connection string, if one is given.
    pub fn with_uri(mut self, uri: Option<String>) -> CliResult<Self> {
        if let Some(uri) = uri {
            self.uri = uri;
            self.validate()?;
        }
        Ok(self)
    }

    fn validate(&self) -> CliResult<()> {
        let required = [
            ("uri", &self.uri),
            ("auth_source", &self.auth_source),
            ("admin_user_env", &self.admin_user_env),
            ("admin_password_env", &self.admin_password_env),
            ("app_name", &self.app_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CliError::config_error(format!("{} must not be empty", field)));
            }
        }

        if embeds_credentials(&self.uri) {
            return Err(CliError::config_error(format!(
                "uri must not embed credentials; set them in ${} and ${}",
                self.admin_user_env, self.admin_password_env
            )));
        }

        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            return Err(CliError::config_error(format!(
                "Invalid uri: '{}'. Must start with mongodb:// or mongodb+srv://",
                self.uri
            )));
        }

        if self.connect_timeout_secs == 0 {
            return Err(CliError::config_error("connect_timeout_secs must be > 0"));
        }

        Ok(())
    }

    pub fn mongo_settings(&self) -> MongoSettings {
        MongoSettings {
            uri: self.uri.clone(),
            auth_source: self.auth_source.clone(),
            app_name: self.app_name.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Resolves the admin credentials through `lookup`.
    pub fn admin_credentials<F>(&self, lookup: F) -> AuthResult<AdminCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        AdminCredentials::resolve(&self.admin_user_env, &self.admin_password_env, lookup)
    }
}

/// Whether the authority part of `uri` carries `user[:password]@`.
fn embeds_credentials(uri: &str) -> bool {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let authority = rest
        .split(|c| c == '/' || c == '?')
        .next()
        .unwrap_or(rest);
    authority.contains('@')
}
