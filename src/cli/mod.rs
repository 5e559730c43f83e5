//! CLI module for schema-provisioner
//!
//! Provides command-line interface for:
//! - provision: Create the principal, collections, and indexes (default)
//! - validate: Offline manifest check
//! - manifest: Print the effective manifest as JSON

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, OutputFormat, ProvisionArgs};
pub use commands::{execute, finish, manifest_json, provision, run, run_command, validate};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_to, write_manifest_ok, write_summary};
