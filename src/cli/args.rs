//! CLI argument definitions using clap
//!
//! Commands:
//! - schema-provisioner (same as `provision` with defaults)
//! - schema-provisioner provision [--config] [--manifest] [--uri] [--output] [--fail-fast]
//! - schema-provisioner validate [--manifest]
//! - schema-provisioner manifest [--manifest]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Idempotent MongoDB schema provisioner
#[derive(Parser, Debug)]
#[command(name = "schema-provisioner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the principal, collections, and indexes a manifest describes
    Provision(ProvisionArgs),

    /// Check a manifest without connecting
    Validate {
        /// Manifest file (built-in manifest if omitted)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Print the effective manifest as JSON
    Manifest {
        /// Manifest file (built-in manifest if omitted)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ProvisionArgs {
    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Manifest file (built-in manifest if omitted)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Connection string, overrides the config file
    #[arg(long)]
    pub uri: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Abort on the first object that fails
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Status lines and a closing summary
    #[default]
    Text,
    /// The report as one JSON document
    Json,
    /// Structured JSON log lines
    Log,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// The command to run; no subcommand means `provision`.
    pub fn into_command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Provision(ProvisionArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_provisions() {
        let cli = Cli::try_parse_from(["schema-provisioner"]).unwrap();
        match cli.into_command() {
            Command::Provision(args) => {
                assert_eq!(args.output, OutputFormat::Text);
                assert!(!args.fail_fast);
                assert!(args.manifest.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_provision_flags() {
        let cli = Cli::try_parse_from([
            "schema-provisioner",
            "provision",
            "--uri",
            "mongodb://db:27017",
            "--output",
            "json",
            "--fail-fast",
        ])
        .unwrap();
        match cli.into_command() {
            Command::Provision(args) => {
                assert_eq!(args.uri.as_deref(), Some("mongodb://db:27017"));
                assert_eq!(args.output, OutputFormat::Json);
                assert!(args.fail_fast);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_output_rejected() {
        assert!(Cli::try_parse_from(["schema-provisioner", "provision", "--output", "xml"]).is_err());
    }
}
