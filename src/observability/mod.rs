//! Observability for provisioning runs
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//!
//! # Usage
//!
//! ```ignore
//! use schema_provisioner::observability::{Event, Logger};
//!
//! Logger::info(Event::CollectionCreated, &[("collection", "minute_bars")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event, FATAL if the event is fatal
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event, fields);
}
