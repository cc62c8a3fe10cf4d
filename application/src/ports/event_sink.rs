//! Port for roundtable lifecycle events.
//!
//! Defines the [`EventSink`] trait the engine and orchestrator emit named
//! lifecycle notifications to (`session_created`, `iteration_start`,
//! `agent_review_complete`, ...).
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port carries structured payloads
//! for progress displays and machine-readable transcripts (JSONL).
//!
//! ```text
//! Orchestrator::run(input, &composite)
//!                             |
//!          +------------------+------------------+
//!          |                                     |
//!   ConsoleProgress (presentation)      JsonlEventLog (infrastructure)
//!   → progress bars                     → events.jsonl
//! ```

use serde_json::Value;

/// Event names emitted during a run, in lifecycle order
pub mod names {
    pub const SESSION_CREATED: &str = "session_created";
    pub const SESSION_RESUMED: &str = "session_resumed";
    pub const ITERATION_START: &str = "iteration_start";
    pub const AGENT_REVIEW_START: &str = "agent_review_start";
    pub const AGENT_REVIEW_COMPLETE: &str = "agent_review_complete";
    pub const MODERATOR_START: &str = "moderator_start";
    pub const MODERATOR_COMPLETE: &str = "moderator_complete";
    pub const CONVERGENCE_CHECKED: &str = "convergence_checked";
    pub const DOCUMENT_SAVED: &str = "document_saved";
    pub const REPORT_SAVED: &str = "report_saved";
    pub const REFINEMENT_COMPLETE: &str = "refinement_complete";
}

/// A named lifecycle notification with a JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct RoundtableEvent {
    /// Event name (one of [`names`])
    pub name: &'static str,
    pub payload: Value,
}

impl RoundtableEvent {
    pub fn new(name: &'static str, payload: Value) -> Self {
        Self { name, payload }
    }
}

/// Receiver of lifecycle events.
///
/// `emit` is synchronous and non-fallible: a slow or broken subscriber must
/// never fail or stall the run, so implementations swallow their own errors.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RoundtableEvent);
}

/// No-op sink for tests and when nobody is listening.
pub struct NoEventSink;

impl EventSink for NoEventSink {
    fn emit(&self, _event: RoundtableEvent) {}
}

/// Fans every event out to several sinks, in order.
pub struct CompositeEventSink<'a> {
    delegates: Vec<&'a dyn EventSink>,
}

impl<'a> CompositeEventSink<'a> {
    pub fn new(delegates: Vec<&'a dyn EventSink>) -> Self {
        Self { delegates }
    }
}

impl EventSink for CompositeEventSink<'_> {
    fn emit(&self, event: RoundtableEvent) {
        for d in &self.delegates {
            d.emit(event.clone());
        }
    }
}
