//! # Authentication Module
//!
//! Administrative credentials, secrets, and privilege checks.
//!
//! ## Features
//!
//! - Environment-sourced admin credentials, resolved once at startup
//! - Credential references for the application principal
//! - Redacted, zeroized secrets
//! - Role-based privilege checks against the manifest

mod credentials;
mod errors;
mod session;

pub use credentials::{
    process_env, AdminCredentials, CredentialRef, DeferredSecret, Secret, SecretSource,
};
pub use errors::{AuthError, AuthResult};
pub use session::{AdminSession, Privilege};
