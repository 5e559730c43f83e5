//! CLI-specific error types
//!
//! Every CLI error ends the process with exit code 1.

use std::fmt;
use std::io;

use crate::auth::AuthError;
use crate::provision::ProvisionFailure;
use crate::schema::SchemaError;
use crate::target::TargetError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Manifest missing, malformed, or invalid
    ManifestError,
    /// Credentials absent, rejected, or insufficient
    AuthFailed,
    /// Could not build a client for the deployment
    ConnectFailed,
    /// Run aborted under the fail-fast policy
    ProvisionAborted,
    /// Run finished, but some objects failed
    ProvisionIncomplete,
    /// I/O error (stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PROV_CLI_CONFIG_ERROR",
            Self::ManifestError => "PROV_CLI_MANIFEST_ERROR",
            Self::AuthFailed => "PROV_CLI_AUTH_FAILED",
            Self::ConnectFailed => "PROV_CLI_CONNECT_FAILED",
            Self::ProvisionAborted => "PROV_CLI_PROVISION_ABORTED",
            Self::ProvisionIncomplete => "PROV_CLI_PROVISION_INCOMPLETE",
            Self::IoError => "PROV_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// Manifest error
    pub fn manifest_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ManifestError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Report contained failures
    pub fn incomplete(failures: usize) -> Self {
        Self::new(
            CliErrorCode::ProvisionIncomplete,
            format!("{} object(s) could not be provisioned", failures),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::manifest_error(e.to_string())
    }
}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        Self::new(CliErrorCode::AuthFailed, format!("{}: {}", e.code(), e))
    }
}

impl From<TargetError> for CliError {
    fn from(e: TargetError) -> Self {
        Self::new(CliErrorCode::ConnectFailed, e.to_string())
    }
}

impl From<ProvisionFailure> for CliError {
    fn from(e: ProvisionFailure) -> Self {
        match e {
            ProvisionFailure::Auth(e) => e.into(),
            ProvisionFailure::Provision(e) => {
                Self::new(CliErrorCode::ProvisionAborted, e.to_string())
            }
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::config_error("connect_timeout_secs must be > 0");
        assert_eq!(
            err.to_string(),
            "PROV_CLI_CONFIG_ERROR: connect_timeout_secs must be > 0"
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err: CliError = AuthError::MissingCredential("MONGO_INITDB_ROOT_PASSWORD".into()).into();
        assert_eq!(err.code(), &CliErrorCode::AuthFailed);
        assert!(err.message().contains("MONGO_INITDB_ROOT_PASSWORD"));
    }

    #[test]
    fn test_incomplete_code() {
        assert_eq!(CliError::incomplete(2).code_str(), "PROV_CLI_PROVISION_INCOMPLETE");
    }
}
