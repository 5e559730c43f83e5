//! Output rendering for CLI commands
//!
//! - JSON documents go to stdout as a single value
//! - Text summaries go to stdout, one line each

use std::io::{self, Write};

use serde::Serialize;

use crate::provision::{Outcome, ProvisionReport};
use crate::schema::SchemaManifest;

use super::errors::CliResult;

/// Write a value as pretty JSON to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_json_to(&mut stdout, value)?;
    stdout.flush()?;
    Ok(())
}

pub fn write_json_to<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Closing summary of a run.
pub fn write_summary<W: Write>(writer: &mut W, report: &ProvisionReport) -> CliResult<()> {
    let failures = report.failures().len();

    if report.all_existed() {
        writeln!(
            writer,
            "Database {} already provisioned, nothing to do",
            report.database
        )?;
    } else {
        writeln!(
            writer,
            "Provisioned database {}: {} collections ({} created), {} indexes created",
            report.database,
            report.collections.len(),
            report.collections_created(),
            report.indexes_created()
        )?;
    }

    let principal = &report.principal;
    let outcome = match principal.outcome {
        Outcome::Created => "created",
        Outcome::AlreadyExisted => "already existed, left unchanged",
        Outcome::Failed => "FAILED",
    };
    writeln!(
        writer,
        "Application user {}@{}: {}",
        principal.name, report.database, outcome
    )?;

    if failures > 0 {
        writeln!(writer, "{} object(s) failed", failures)?;
    }
    Ok(())
}

/// One-line description of a valid manifest.
pub fn write_manifest_ok<W: Write>(writer: &mut W, manifest: &SchemaManifest) -> CliResult<()> {
    writeln!(
        writer,
        "Manifest OK: database {}, principal {}, {} collections, {} indexes",
        manifest.database,
        manifest.principal.name,
        manifest.collections.len(),
        manifest.index_count()
    )?;
    Ok(())
}
