//! CLI command implementations
//!
//! `provision` order:
//! 1. Load config and manifest (manifest validated)
//! 2. Resolve admin credentials from the environment
//! 3. Connect, then run the provisioner on a current-thread runtime; the
//!    principal's password is read from the environment only if the
//!    principal has to be created
//! 4. Render the report; exit non-zero if anything failed

use std::io;
use std::path::Path;

use crate::auth::{process_env, AdminCredentials, DeferredSecret, SecretSource};
use crate::observability::{log_event, Event, Logger};
use crate::provision::{
    ConsoleObserver, FailurePolicy, LogObserver, ProvisionFailure, ProvisionReport, Provisioner,
};
use crate::schema::{ManifestLoader, ManifestValidator, SchemaManifest};
use crate::target::{MongoTarget, SchemaTarget};

use super::args::{Cli, Command, OutputFormat, ProvisionArgs};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_manifest_ok, write_summary};

/// Parse arguments and run
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.into_command())
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Provision(args) => provision(&args),
        Command::Validate { manifest } => validate(manifest.as_deref()),
        Command::Manifest { manifest } => manifest_json(manifest.as_deref()),
    }
}

/// Provision the manifest against the configured deployment
pub fn provision(args: &ProvisionArgs) -> CliResult<()> {
    let log = args.output == OutputFormat::Log;

    let config = Config::load_or_default(args.config.as_deref())?.with_uri(args.uri.clone())?;
    if log {
        Logger::info(
            Event::ConfigLoaded,
            &[("uri", config.uri.as_str()), ("auth_source", config.auth_source.as_str())],
        );
    }

    let manifest = ManifestLoader::load_or_builtin(args.manifest.as_deref())?;
    if log {
        let collections = manifest.collections.len().to_string();
        Logger::info(
            Event::ManifestLoaded,
            &[
                ("database", manifest.database.as_str()),
                ("collections", collections.as_str()),
            ],
        );
    }

    let admin = match config.admin_credentials(process_env) {
        Ok(admin) => admin,
        Err(e) => {
            if log {
                let reason = e.to_string();
                log_event(Event::AuthFailed, &[("code", e.code()), ("reason", reason.as_str())]);
            }
            return Err(e.into());
        }
    };
    let principal_secret = DeferredSecret::new(&manifest.principal.credential, process_env);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let report = runtime.block_on(provision_mongo(
        &config,
        &admin,
        &manifest,
        &principal_secret,
        args,
    ))?;

    finish(&report, args.output)
}

async fn provision_mongo<S: SecretSource + ?Sized>(
    config: &Config,
    admin: &AdminCredentials,
    manifest: &SchemaManifest,
    principal_secret: &S,
    args: &ProvisionArgs,
) -> CliResult<ProvisionReport> {
    let target = MongoTarget::connect(&config.mongo_settings(), admin).await?;
    execute(&target, manifest, principal_secret, args).await
}

/// Runs the provisioner with the observer `args` asks for.
///
/// Fatal failures are logged in `log` mode before they are returned.
pub async fn execute<T: SchemaTarget + ?Sized, S: SecretSource + ?Sized>(
    target: &T,
    manifest: &SchemaManifest,
    principal_secret: &S,
    args: &ProvisionArgs,
) -> CliResult<ProvisionReport> {
    let policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::Isolate
    };

    let mut provisioner = Provisioner::new(target).with_policy(policy);
    let result = match args.output {
        OutputFormat::Text => {
            provisioner
                .with_observer(ConsoleObserver::stdio())
                .provision(manifest, principal_secret)
                .await
        }
        OutputFormat::Json => provisioner.provision(manifest, principal_secret).await,
        OutputFormat::Log => {
            let digest = ManifestLoader::digest(manifest);
            Logger::info(
                Event::ProvisionBegin,
                &[("database", manifest.database.as_str()), ("digest", digest.as_str())],
            );
            provisioner
                .with_observer(LogObserver)
                .provision(manifest, principal_secret)
                .await
        }
    };

    result.map_err(|failure| {
        if args.output == OutputFormat::Log {
            let (event, reason) = match &failure {
                ProvisionFailure::Auth(e) => (Event::AuthFailed, e.to_string()),
                ProvisionFailure::Provision(e) => (Event::ProvisionAborted, e.to_string()),
            };
            log_event(event, &[("reason", reason.as_str())]);
        }
        CliError::from(failure)
    })
}

/// Renders `report` and turns failures into an error.
pub fn finish(report: &ProvisionReport, output: OutputFormat) -> CliResult<()> {
    let failures = report.failures().len();

    match output {
        OutputFormat::Text => write_summary(&mut io::stdout(), report)?,
        OutputFormat::Json => write_json(report)?,
        OutputFormat::Log => {
            let run_id = report.run_id.to_string();
            let collections = report.collections_created().to_string();
            let indexes = report.indexes_created().to_string();
            let failed = failures.to_string();
            let fields = [
                ("run_id", run_id.as_str()),
                ("database", report.database.as_str()),
                ("collections_created", collections.as_str()),
                ("indexes_created", indexes.as_str()),
                ("failures", failed.as_str()),
            ];
            if failures > 0 {
                Logger::warn(Event::ProvisionComplete, &fields);
            } else {
                Logger::info(Event::ProvisionComplete, &fields);
            }
        }
    }

    if failures > 0 {
        return Err(CliError::incomplete(failures));
    }
    Ok(())
}

/// Check a manifest offline, printing every violation
pub fn validate(manifest_path: Option<&Path>) -> CliResult<()> {
    let manifest = match manifest_path {
        Some(path) => ManifestLoader::parse_file(path)?,
        None => crate::schema::builtin_manifest(),
    };

    let violations = ManifestValidator::violations(&manifest);
    if violations.is_empty() {
        write_manifest_ok(&mut io::stdout(), &manifest)?;
        return Ok(());
    }

    for violation in &violations {
        eprintln!("{}", violation);
    }
    Err(CliError::manifest_error(format!(
        "{} violation(s) in manifest for database {}",
        violations.len(),
        manifest.database
    )))
}

/// Print the effective manifest
pub fn manifest_json(manifest_path: Option<&Path>) -> CliResult<()> {
    let manifest = ManifestLoader::load_or_builtin(manifest_path)?;
    write_json(&manifest)
}
