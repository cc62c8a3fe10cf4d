//! JSONL file writer for roundtable events.
//!
//! Each [`RoundtableEvent`] is serialized as a single JSON line with a
//! `type` field and `timestamp`, appended to the file via a buffered writer.

use roundtable_application::ports::event_sink::{EventSink, RoundtableEvent};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL event log that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Appends to an existing file so
/// a resumed session keeps one transcript. Flushes on `Drop`.
pub struct JsonlEventLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventLog {
    /// Open (or create) the log at the given path.
    ///
    /// Creates parent directories if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventLog {
    fn emit(&self, event: RoundtableEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // payload fields sit next to type + timestamp
        let record = if let Value::Object(mut map) = event.payload {
            map.insert("type".to_string(), Value::String(event.name.to_string()));
            map.insert("timestamp".to_string(), Value::String(timestamp));
            Value::Object(map)
        } else {
            serde_json::json!({
                "type": event.name,
                "timestamp": timestamp,
                "data": event.payload,
            })
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlEventLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_application::ports::event_sink::names;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_event_log_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session.events.jsonl");
        let log = JsonlEventLog::new(&path).unwrap();

        log.emit(RoundtableEvent::new(
            names::SESSION_CREATED,
            serde_json::json!({ "session_id": "s1", "max_iterations": 3 }),
        ));
        log.emit(RoundtableEvent::new(
            names::AGENT_REVIEW_COMPLETE,
            serde_json::json!({ "agent": "Security", "high": 1 }),
        ));
        drop(log);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert!(line.get("timestamp").is_some());
        }
        assert_eq!(lines[0]["type"], "session_created");
        assert_eq!(lines[0]["session_id"], "s1");
        assert_eq!(lines[0]["max_iterations"], 3);
        assert_eq!(lines[1]["type"], "agent_review_complete");
        assert_eq!(lines[1]["agent"], "Security");
    }

    #[test]
    fn test_event_log_wraps_non_object_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = JsonlEventLog::new(&path).unwrap();

        log.emit(RoundtableEvent::new(names::REPORT_SAVED, Value::from("done")));
        drop(log);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "report_saved");
        assert_eq!(lines[0]["data"], "done");
    }

    #[test]
    fn test_event_log_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let first = JsonlEventLog::new(&path).unwrap();
        first.emit(RoundtableEvent::new(names::SESSION_CREATED, Value::Null));
        drop(first);

        let second = JsonlEventLog::new(&path).unwrap();
        second.emit(RoundtableEvent::new(names::SESSION_RESUMED, Value::Null));
        assert_eq!(second.path(), path.as_path());
        drop(second);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["type"], "session_resumed");
    }
}
