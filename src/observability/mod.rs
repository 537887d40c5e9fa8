//! Observability for ledgergate
//!
//! - Structured logging (one JSON object per line, stderr)
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on workflow state
//! 3. Deterministic output
//!
//! The fact ledger is the audit trail. These logs are operator diagnostics
//! and are never replayed.
//!
//! # Usage
//!
//! ```ignore
//! use ledgergate::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::DecisionQueued, &[("decision_id", "...")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a lifecycle event at WARN (rejected navigation, ignored input)
pub fn warn_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(Severity::Warn, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Only verifies no panic
        log_event(Event::ServiceStart);
        log_event(Event::ServiceReady);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/ledgergate.json")]);
        warn_event(Event::NavigationRejected, &[("page", "P5")]);
    }
}
