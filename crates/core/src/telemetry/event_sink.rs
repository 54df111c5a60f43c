use std::fmt;

use serde_json::Value;

/// Telemetry events raised while serving moose requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A request named an image the service is about to look at.
    MooseRetrieval,
    /// A cache miss started a fresh computation.
    NewMoose,
    /// A computation failed and a fallback image was served.
    ErrorMoosificating,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MooseRetrieval => "moose_retrieval",
            Self::NewMoose => "new_moose",
            Self::ErrorMoosificating => "error_moosificating",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort event reporting. Implementations must not fail or block for
/// long; callers never look at the outcome.
pub trait EventSink: Send + Sync {
    fn emit(&self, kind: EventKind, fields: Value);
}

/// Discards all events.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _kind: EventKind, _fields: Value) {}
}

/// Writes each event as one JSON line on the `moose_events` log target, so
/// `RUST_LOG=moose_events=info` isolates them.
pub struct LogEventSink;

pub const EVENT_LOG_TARGET: &str = "moose_events";

impl LogEventSink {
    pub fn format(kind: EventKind, fields: &Value) -> String {
        format!("{} {}", kind, fields)
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, kind: EventKind, fields: Value) {
        log::info!(target: EVENT_LOG_TARGET, "{}", Self::format(kind, &fields));
    }
}
