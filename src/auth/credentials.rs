//! # Credentials
//!
//! Admin credentials are resolved once, at process start, from environment
//! variables. The application principal's password is resolved only when the
//! principal has to be created. Variable *names* come from configuration or
//! the manifest; values never appear in either.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::errors::{AuthError, AuthResult};

/// A secret string. Redacted in `Debug`/`Display`, zeroized on drop.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the secret value. Callers must not log it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Reference to a credential held outside the manifest.
///
/// Serialized as `{"env": "VARIABLE_NAME"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Environment variable holding the value
    pub env: String,
}

impl CredentialRef {
    pub fn env(var: impl Into<String>) -> Self {
        Self { env: var.into() }
    }

    /// Resolves the reference through `lookup`.
    pub fn resolve<F>(&self, lookup: F) -> AuthResult<Secret>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = lookup(&self.env).ok_or_else(|| AuthError::MissingCredential(self.env.clone()))?;
        check_value(&self.env, &value)?;
        Ok(Secret::new(value))
    }
}

/// Supplies a secret when it is first needed.
pub trait SecretSource {
    fn secret(&self) -> AuthResult<Secret>;
}

impl SecretSource for Secret {
    fn secret(&self) -> AuthResult<Secret> {
        Ok(self.clone())
    }
}

/// A credential reference resolved through `lookup` on demand.
pub struct DeferredSecret<'a, F> {
    reference: &'a CredentialRef,
    lookup: F,
}

impl<'a, F> DeferredSecret<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(reference: &'a CredentialRef, lookup: F) -> Self {
        Self { reference, lookup }
    }
}

impl<F> SecretSource for DeferredSecret<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn secret(&self) -> AuthResult<Secret> {
        self.reference.resolve(&self.lookup)
    }
}

/// Administrative credentials for the engine's admin scope.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub user: String,
    pub password: Secret,
}

impl AdminCredentials {
    pub fn new(user: impl Into<String>, password: Secret) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    /// Resolves both values through `lookup`.
    pub fn resolve<F>(user_var: &str, password_var: &str, lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = lookup(user_var).ok_or_else(|| AuthError::MissingCredential(user_var.to_string()))?;
        check_value(user_var, &user)?;

        let password = CredentialRef::env(password_var).resolve(&lookup)?;

        Ok(Self { user, password })
    }
}

/// Looks a variable up in the process environment.
pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

fn check_value(var: &str, value: &str) -> AuthResult<()> {
    if value.trim().is_empty() {
        return Err(AuthError::MalformedCredential {
            var: var.to_string(),
            reason: "value is empty".to_string(),
        });
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(AuthError::MalformedCredential {
            var: var.to_string(),
            reason: "value contains control characters".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_resolve_admin_credentials() {
        let env = env_of(&[("ADMIN_USER", "root"), ("ADMIN_PASS", "s3cret")]);
        let creds = AdminCredentials::resolve("ADMIN_USER", "ADMIN_PASS", env).unwrap();
        assert_eq!(creds.user, "root");
        assert_eq!(creds.password.expose(), "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }

    #[test]
    fn test_missing_password() {
        let env = env_of(&[("ADMIN_USER", "root")]);
        let err = AdminCredentials::resolve("ADMIN_USER", "ADMIN_PASS", env).unwrap_err();
        assert_eq!(err, AuthError::MissingCredential("ADMIN_PASS".into()));
    }

    #[test]
    fn test_empty_user_is_malformed() {
        let env = env_of(&[("ADMIN_USER", "  "), ("ADMIN_PASS", "x")]);
        let err = AdminCredentials::resolve("ADMIN_USER", "ADMIN_PASS", env).unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredential { ref var, .. } if var == "ADMIN_USER"));
    }

    #[test]
    fn test_trailing_newline_is_malformed() {
        let env = env_of(&[("APP_PASS", "secret\n")]);
        let err = CredentialRef::env("APP_PASS").resolve(env).unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredential { .. }));
    }

    #[test]
    fn test_deferred_secret_resolves_on_use() {
        let reference = CredentialRef::env("APP_PASS");
        let deferred = DeferredSecret::new(&reference, env_of(&[]));
        assert_eq!(
            deferred.secret().unwrap_err(),
            AuthError::MissingCredential("APP_PASS".into())
        );

        let deferred = DeferredSecret::new(&reference, env_of(&[("APP_PASS", "pw")]));
        assert_eq!(deferred.secret().unwrap().expose(), "pw");
    }

    #[test]
    fn test_credential_ref_json() {
        let r: CredentialRef = serde_json::from_str(r#"{"env": "QUANT_USER_PASSWORD"}"#).unwrap();
        assert_eq!(r, CredentialRef::env("QUANT_USER_PASSWORD"));
    }
}
