//! Structured JSONL log of quota decisions.
//!
//! Every admission decision and swallowed storage fault is appended to
//! `~/.contact-quota/logs/events.jsonl` as one JSON object per line, with a
//! monotonic sequence number and an ISO 8601 timestamp. The log exists for
//! debugging; writing to it is best-effort and never interrupts the caller.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::paths;

/// Structured JSONL logger for quota decisions.
pub struct EventLog {
    seq: AtomicU64,
    log_file: Mutex<File>,
}

/// A single log entry in JSONL format.
#[derive(Serialize)]
struct LogEntry {
    /// Monotonic sequence number within this process
    seq: u64,
    /// ISO 8601 timestamp with microseconds
    ts: String,
    /// Component that emitted the log
    component: String,
    /// Structured event data
    event: Value,
}

impl EventLog {
    /// Opens the decision log, creating the logs directory if needed.
    pub fn open() -> anyhow::Result<Self> {
        let log_path = paths::events_log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
        })
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Logs a structured event.
    ///
    /// The event is serialized to JSON and written as a single line. Write
    /// failures are swallowed; this method is thread-safe.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = LogEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }

    /// Logs an admission decision.
    pub fn log_decision(&self, user_id: &str, record_id: &str, allowed: bool, remaining: u32) {
        self.log(
            "Tracker",
            serde_json::json!({
                "type": "ViewDecision",
                "user_id": user_id,
                "record_id": record_id,
                "allowed": allowed,
                "remaining": remaining
            }),
        );
    }

    /// Logs a storage fault that was recovered locally.
    pub fn log_store_fault(&self, user_id: &str, detail: &str) {
        self.log(
            "Store",
            serde_json::json!({
                "type": "StoreFault",
                "user_id": user_id,
                "detail": detail
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::set_home_for_test;
    use tempfile::TempDir;

    #[test]
    fn test_log_writes_jsonl_with_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = set_home_for_test(temp_dir.path().to_path_buf());

        let log = EventLog::open().unwrap();
        log.log_decision("user_1", "c_1", true, 49);
        log.log_store_fault("user_1", "disk full");

        let content = std::fs::read_to_string(
            temp_dir.path().join(".contact-quota/logs/events.jsonl"),
        )
        .unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["seq"], 1);
        assert_eq!(first["component"], "Tracker");
        assert_eq!(first["event"]["type"], "ViewDecision");
        assert_eq!(first["event"]["allowed"], true);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["seq"], 2);
        assert_eq!(second["event"]["type"], "StoreFault");
    }
}
