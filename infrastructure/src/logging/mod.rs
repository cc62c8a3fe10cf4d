//! Logging infrastructure: structured event logging.
//!
//! Provides [`JsonlEventLog`], a JSONL file writer that implements the
//! [`EventSink`](roundtable_application::EventSink) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlEventLog;
