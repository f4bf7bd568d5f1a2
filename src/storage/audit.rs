//! Append-only audit log.
//!
//! Events are stored as newline-delimited JSON, one object per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::{AuditEvent, AuditOutcome};
use crate::error::{ShieldError, ShieldResult};

/// Durable sink for decision and output events.
pub trait AuditSink: Send + Sync {
    /// Append one event. Concurrent calls never interleave partial lines.
    fn record(&self, event: &AuditEvent) -> ShieldResult<()>;

    /// Most recent events with the given outcome, oldest first.
    fn recent(&self, outcome: AuditOutcome, limit: usize) -> ShieldResult<Vec<AuditEvent>>;
}

/// JSONL file sink. A mutex serializes appends.
pub struct JsonlAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    /// Open a sink at `path`, creating missing parent directories.
    pub fn new(path: impl Into<PathBuf>) -> ShieldResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> ShieldResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| ShieldError::Internal("audit log lock poisoned".to_string()))
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) -> ShieldResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.guard()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn recent(&self, outcome: AuditOutcome, limit: usize) -> ShieldResult<Vec<AuditEvent>> {
        let _guard = self.guard()?;
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut matching = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(&line) {
                Ok(event) if event.decision == outcome => matching.push(event),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable audit line"),
            }
        }

        let skip = matching.len().saturating_sub(limit);
        Ok(matching.split_off(skip))
    }
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> ShieldResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn recent(&self, outcome: AuditOutcome, limit: usize) -> ShieldResult<Vec<AuditEvent>> {
        let mut matching: Vec<AuditEvent> = self
            .events()
            .into_iter()
            .filter(|e| e.decision == outcome)
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn event(text: &str, decision: AuditOutcome) -> AuditEvent {
        AuditEvent {
            time: Utc::now(),
            text: text.to_string(),
            decision,
            meta: json!({"reason": "low_risk"}),
        }
    }

    #[test]
    fn test_record_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("events.jsonl")).unwrap();

        sink.record(&event("first", AuditOutcome::Allow)).unwrap();
        sink.record(&event("second", AuditOutcome::Block)).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["text"], "first");
        assert_eq!(first["decision"], "ALLOW");
        assert!(first["time"].as_str().unwrap().ends_with('Z'));
        assert_eq!(first["meta"]["reason"], "low_risk");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/nested/events.jsonl");
        let sink = JsonlAuditSink::new(&path).unwrap();

        sink.record(&event("x", AuditOutcome::Flag)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_recent_filters_and_limits() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("events.jsonl")).unwrap();

        for i in 0..5 {
            sink.record(&event(&format!("flag {i}"), AuditOutcome::Flag)).unwrap();
            sink.record(&event(&format!("allow {i}"), AuditOutcome::Allow)).unwrap();
        }

        let recent = sink.recent(AuditOutcome::Flag, 2).unwrap();
        let texts: Vec<&str> = recent.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["flag 3", "flag 4"]);
    }

    #[test]
    fn test_recent_on_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("never-written.jsonl")).unwrap();
        assert!(sink.recent(AuditOutcome::Flag, 10).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(JsonlAuditSink::new(dir.path().join("events.jsonl")).unwrap());
        let long_text = "x".repeat(4096);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                let text = long_text.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        sink.record(&event(&text, AuditOutcome::Allow)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let parsed: AuditEvent = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.text.len(), 4096);
        }
    }
}
