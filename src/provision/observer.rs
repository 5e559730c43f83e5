//! Provisioning observers
//!
//! The provisioner reports progress through `ProvisionObserver` callbacks
//! instead of printing. Two renderings ship with the crate:
//! - `ConsoleObserver`: human-readable status lines
//! - `LogObserver`: structured JSON log lines

use std::io::{self, Write};

use crate::observability::{Event, Logger};

use super::errors::ProvisionError;
use super::report::CollectionReport;

/// Progress event emitted during a run
#[derive(Debug, Clone, Copy)]
pub enum ProvisionEvent<'a> {
    Authenticated {
        user: &'a str,
    },
    DatabaseSelected {
        database: &'a str,
    },
    PrincipalCreated {
        name: &'a str,
    },
    PrincipalExisted {
        name: &'a str,
    },
    IndexCreated {
        collection: &'a str,
        index: &'a str,
    },
    IndexExisted {
        collection: &'a str,
        index: &'a str,
        drift: Option<&'a str>,
    },
    /// One per collection, after all its indexes were attempted
    CollectionDone {
        report: &'a CollectionReport,
    },
    Failed {
        error: &'a ProvisionError,
    },
}

/// Receives progress events.
pub trait ProvisionObserver {
    fn on_event(&mut self, event: &ProvisionEvent<'_>);
}

impl<O: ProvisionObserver + ?Sized> ProvisionObserver for &mut O {
    fn on_event(&mut self, event: &ProvisionEvent<'_>) {
        (**self).on_event(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProvisionObserver for NoopObserver {
    fn on_event(&mut self, _event: &ProvisionEvent<'_>) {}
}

/// Writes one human-readable line per event.
///
/// Progress goes to `out`, failures and drift warnings to `err`. A line that
/// cannot be written to its stream is sent to the process stderr instead and
/// counted in `write_failures`.
pub struct ConsoleObserver<O: Write, E: Write> {
    out: O,
    err: E,
    write_failures: usize,
}

impl ConsoleObserver<io::Stdout, io::Stderr> {
    /// Observer writing to stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> ConsoleObserver<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            write_failures: 0,
        }
    }

    /// Lines that could not be written to their stream.
    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    /// Returns the writers.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

fn indexes(n: usize) -> String {
    if n == 1 {
        "1 index".to_string()
    } else {
        format!("{} indexes", n)
    }
}

enum Stream {
    Out,
    Err,
}

fn console_line(event: &ProvisionEvent<'_>) -> Option<(Stream, String)> {
    let line = match *event {
        ProvisionEvent::Authenticated { user } => (Stream::Out, format!("Authenticated as {}", user)),
        ProvisionEvent::DatabaseSelected { database } => {
            (Stream::Out, format!("Using database: {}", database))
        }
        ProvisionEvent::PrincipalCreated { name } => (Stream::Out, format!("Created user: {}", name)),
        ProvisionEvent::PrincipalExisted { name } => (
            Stream::Out,
            format!("User {} already exists, left unchanged", name),
        ),
        ProvisionEvent::IndexCreated { collection, index } => (
            Stream::Out,
            format!("  Created index: {}.{}", collection, index),
        ),
        ProvisionEvent::IndexExisted {
            collection,
            index,
            drift: Some(drift),
        } => (
            Stream::Err,
            format!(
                "WARNING index {}.{} exists with different options: {}",
                collection, index, drift
            ),
        ),
        ProvisionEvent::IndexExisted { drift: None, .. } => return None,
        ProvisionEvent::CollectionDone { report } if report.is_failed() => (
            Stream::Err,
            format!(
                "FAILED collection: {} ({} errors)",
                report.name,
                report.errors.len()
            ),
        ),
        ProvisionEvent::CollectionDone { report } if report.already_existed => (
            Stream::Out,
            format!(
                "Collection {} already exists ({} created)",
                report.name,
                indexes(report.indexes_created)
            ),
        ),
        ProvisionEvent::CollectionDone { report } => (
            Stream::Out,
            format!(
                "Created collection: {} with {}",
                report.name,
                indexes(report.indexes_created)
            ),
        ),
        ProvisionEvent::Failed { error } => (Stream::Err, format!("FAILED {}", error)),
    };
    Some(line)
}

impl<O: Write, E: Write> ProvisionObserver for ConsoleObserver<O, E> {
    fn on_event(&mut self, event: &ProvisionEvent<'_>) {
        let Some((stream, line)) = console_line(event) else {
            return;
        };
        let written = match stream {
            Stream::Out => writeln!(self.out, "{}", line),
            Stream::Err => writeln!(self.err, "{}", line),
        };
        if written.is_err() {
            self.write_failures += 1;
            // Best effort.
            let _ = writeln!(io::stderr(), "{}", line);
        }
    }
}

/// Maps events onto the structured logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProvisionObserver for LogObserver {
    fn on_event(&mut self, event: &ProvisionEvent<'_>) {
        match *event {
            ProvisionEvent::Authenticated { user } => Logger::info(Event::AuthOk, &[("user", user)]),
            ProvisionEvent::DatabaseSelected { database } => {
                Logger::info(Event::DatabaseSelected, &[("database", database)])
            }
            ProvisionEvent::PrincipalCreated { name } => {
                Logger::info(Event::PrincipalCreated, &[("principal", name)])
            }
            ProvisionEvent::PrincipalExisted { name } => {
                Logger::info(Event::PrincipalExists, &[("principal", name)])
            }
            ProvisionEvent::IndexCreated { collection, index } => Logger::info(
                Event::IndexCreated,
                &[("collection", collection), ("index", index)],
            ),
            ProvisionEvent::IndexExisted {
                collection,
                index,
                drift,
            } => match drift {
                Some(drift) => Logger::warn(
                    Event::IndexDrift,
                    &[("collection", collection), ("index", index), ("drift", drift)],
                ),
                None => Logger::info(
                    Event::IndexExists,
                    &[("collection", collection), ("index", index)],
                ),
            },
            ProvisionEvent::CollectionDone { report } => {
                let created = report.indexes_created.to_string();
                let fields = [
                    ("collection", report.name.as_str()),
                    ("indexes_created", created.as_str()),
                ];
                if report.is_failed() {
                    let failed = report.errors.len().to_string();
                    Logger::error(
                        Event::ObjectFailed,
                        &[
                            ("collection", report.name.as_str()),
                            ("failures", failed.as_str()),
                        ],
                    );
                } else if report.already_existed {
                    Logger::info(Event::CollectionExists, &fields);
                } else {
                    Logger::info(Event::CollectionCreated, &fields);
                }
            }
            ProvisionEvent::Failed { error } => {
                let object = error.object.to_string();
                Logger::error(
                    Event::ObjectFailed,
                    &[
                        ("object", object.as_str()),
                        ("kind", error.kind.as_str()),
                        ("reason", error.message.as_str()),
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::errors::{ObjectRef, ProvisionErrorKind};

    fn render(events: &[ProvisionEvent<'_>]) -> (String, String) {
        let mut observer = ConsoleObserver::new(Vec::new(), Vec::new());
        for event in events {
            observer.on_event(event);
        }
        let (out, err) = observer.into_inner();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_created_collection_line() {
        let mut report = CollectionReport::new("minute_bars");
        report.indexes_created = 3;
        let (out, err) = render(&[ProvisionEvent::CollectionDone { report: &report }]);
        assert_eq!(out, "Created collection: minute_bars with 3 indexes\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_existing_collection_line() {
        let mut report = CollectionReport::new("positions");
        report.already_existed = true;
        report.indexes_created = 1;
        let (out, _) = render(&[ProvisionEvent::CollectionDone { report: &report }]);
        assert_eq!(out, "Collection positions already exists (1 index created)\n");
    }

    #[test]
    fn test_failures_go_to_err() {
        let error = ProvisionError::new(
            ObjectRef::index("finance", "trade_signals", "order_id_1"),
            ProvisionErrorKind::DuplicateKey,
            "E11000",
        );
        let (out, err) = render(&[ProvisionEvent::Failed { error: &error }]);
        assert!(out.is_empty());
        assert_eq!(
            err,
            "FAILED index finance.trade_signals.order_id_1: duplicate_key: E11000\n"
        );
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unwritable_stream_is_counted() {
        let error = ProvisionError::new(
            ObjectRef::collection("finance", "positions"),
            ProvisionErrorKind::Engine,
            "disk full",
        );
        let mut observer = ConsoleObserver::new(Vec::new(), Broken);

        observer.on_event(&ProvisionEvent::Failed { error: &error });
        observer.on_event(&ProvisionEvent::PrincipalCreated { name: "quant_user" });

        assert_eq!(observer.write_failures(), 1);
        let (out, _) = observer.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "Created user: quant_user\n");
    }

    #[test]
    fn test_drift_warning() {
        let (out, err) = render(&[
            ProvisionEvent::IndexExisted {
                collection: "c",
                index: "a_1",
                drift: None,
            },
            ProvisionEvent::IndexExisted {
                collection: "c",
                index: "b_1",
                drift: Some("unique is false, manifest wants true"),
            },
        ]);
        assert!(out.is_empty());
        assert!(err.contains("c.b_1"));
        assert!(!err.contains("a_1"));
    }
}
