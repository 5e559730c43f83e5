//! Structured JSON logger
//!
//! - One log line = one event
//! - Key order: `event`, `severity`, `ts`, then fields alphabetically
//! - INFO and WARN to stdout, ERROR and FATAL to stderr
//! - Synchronous, no buffering

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info = 1,
    /// Completed, but needs operator attention
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Run aborted
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn to_stderr(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: Event, fields: &[(&str, &str)]) {
        let line = Self::format_line(severity, event, fields);
        let _ = if severity.to_stderr() {
            Self::write_line(&mut io::stderr(), &line)
        } else {
            Self::write_line(&mut io::stdout(), &line)
        };
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    /// Renders one log line, newline included.
    pub fn format_line(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(256);

        output.push_str("{\"event\":");
        push_json_string(&mut output, event.as_str());
        output.push_str(",\"severity\":");
        push_json_string(&mut output, severity.as_str());
        output.push_str(",\"ts\":");
        push_json_string(
            &mut output,
            &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, value) in sorted {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push_str("}\n");
        output
    }

    pub fn info(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn push_json_string(output: &mut String, s: &str) {
    // A &str always serializes.
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}
