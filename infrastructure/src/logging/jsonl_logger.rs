//! JSONL transcript of council runs.
//!
//! Each [`ConversationEvent`] becomes one line: the payload's fields plus
//! `type` and an RFC3339 `timestamp`. Files are opened in append mode so
//! repeated runs of one conversation accumulate in the same file.

use council_application::{ConversationEvent, ConversationLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `path` for appending, creating it and its parents.
    ///
    /// Returns `None` (after a warning) when the file cannot be opened; the
    /// caller then runs without a transcript.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create transcript directory {}: {}", parent.display(), e);
            return None;
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Self {
                writer: Mutex::new(BufWriter::new(file)),
                path: path.to_path_buf(),
            }),
            Err(e) => {
                warn!("Could not open transcript {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Open the transcript for a conversation inside `dir`.
    ///
    /// Named `<conversation_id>.jsonl`; runs without an id get a dated file.
    pub fn in_dir(dir: impl AsRef<Path>, conversation_id: Option<&str>) -> Option<Self> {
        let name = match conversation_id {
            Some(id) => format!("{}.jsonl", sanitize(id)),
            None => format!("council-{}.jsonl", chrono::Local::now().format("%Y-%m-%d")),
        };
        Self::open(dir.as_ref().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ConversationEvent) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut record = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::from(event.event_type));
        record.insert("timestamp".to_string(), Value::from(timestamp));
        Value::Object(record)
    }
}

/// Keep ids usable as file names
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_council_events_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlConversationLogger::in_dir(dir.path(), Some("conv-42")).unwrap();
        let path = logger.path().to_path_buf();
        assert!(path.ends_with("conv-42.jsonl"));

        logger.log(ConversationEvent::new(
            "expert_answer",
            json!({"query_id": "q1", "provider": "openai", "succeeded": true}),
        ));
        logger.log(ConversationEvent::new(
            "peer_review",
            json!({"query_id": "q1", "reviewer": "openai", "target": "anthropic", "rank": 1}),
        ));
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "expert_answer");
        assert_eq!(records[0]["provider"], "openai");
        assert_eq!(records[1]["type"], "peer_review");
        assert_eq!(records[1]["rank"], 1);
        assert!(records.iter().all(|r| r["timestamp"].is_string()));
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/transcript.jsonl");

        for provider in ["openai", "anthropic"] {
            let logger = JsonlConversationLogger::open(&path).unwrap();
            logger.log(ConversationEvent::new("synthesis", json!({"provider": provider})));
        }

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["provider"], "anthropic");
    }

    #[test]
    fn test_non_object_payload_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlConversationLogger::open(dir.path().join("t.jsonl")).unwrap();
        let path = logger.path().to_path_buf();
        logger.log(ConversationEvent::new("synthesis", json!("plain text")));
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records[0]["type"], "synthesis");
        assert_eq!(records[0]["data"], "plain text");
    }

    #[test]
    fn test_conversation_id_sanitized() {
        assert_eq!(sanitize("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize("abc-123_x"), "abc-123_x");
    }
}
