//! JSONL decision log for LLM calls.
//!
//! One JSON object per line, each an `llm_request`, `llm_response`, or
//! `llm_error` with the request id, timestamp, and payload. Response
//! payloads carry a SHA-256 of the full output plus a short excerpt.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

const EXCERPT_LEN: usize = 500;

#[derive(Debug, Serialize)]
struct RequestEntry<'a> {
    event: &'static str,
    request_id: Uuid,
    timestamp: chrono::DateTime<Utc>,
    kind: &'a str,
    model: &'a str,
    payload: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseEntry<'a> {
    event: &'static str,
    request_id: Uuid,
    timestamp: chrono::DateTime<Utc>,
    latency_ms: u64,
    output_hash: String,
    excerpt: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorEntry<'a> {
    event: &'static str,
    request_id: Uuid,
    timestamp: chrono::DateTime<Utc>,
    error: &'a str,
}

pub struct DecisionLog {
    file: Mutex<std::fs::File>,
}

impl DecisionLog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    fn write_line<T: Serialize>(&self, entry: &T) {
        let Ok(line) = serde_json::to_string(entry) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("decision log write failed: {e}");
            }
        }
    }

    /// Record an outgoing call; the returned id ties the later response
    /// or error back to it.
    pub fn log_request(&self, kind: &str, model: &str, payload: &str) -> Uuid {
        let request_id = Uuid::new_v4();
        self.write_line(&RequestEntry {
            event: "llm_request",
            request_id,
            timestamp: Utc::now(),
            kind,
            model,
            payload,
        });
        request_id
    }

    pub fn log_response(&self, request_id: Uuid, output: &str, latency_ms: u64) {
        let mut hasher = Sha256::new();
        hasher.update(output.as_bytes());
        let output_hash = format!("{:x}", hasher.finalize());
        let excerpt: String = output.chars().take(EXCERPT_LEN).collect();
        self.write_line(&ResponseEntry {
            event: "llm_response",
            request_id,
            timestamp: Utc::now(),
            latency_ms,
            output_hash,
            excerpt: &excerpt,
        });
    }

    pub fn log_error(&self, request_id: Uuid, error: &str) {
        self.write_line(&ErrorEntry {
            event: "llm_error",
            request_id,
            timestamp: Utc::now(),
            error,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let log = DecisionLog::open(&path).unwrap();

        let id = log.log_request("narrative", "gpt-4o-mini", "prompt text");
        log.log_response(id, "the narrative output", 420);
        log.log_error(id, "boom");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let request: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(request["event"], "llm_request");
        assert_eq!(request["kind"], "narrative");

        let response: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(response["event"], "llm_response");
        assert_eq!(response["request_id"], request["request_id"]);
        assert_eq!(response["latency_ms"], 420);
        assert_eq!(response["output_hash"].as_str().unwrap().len(), 64);

        let error: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(error["event"], "llm_error");
    }

    #[test]
    fn test_excerpt_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let log = DecisionLog::open(&path).unwrap();
        let id = log.log_request("scoring", "m", "p");
        log.log_response(id, &"x".repeat(2000), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        let response: serde_json::Value =
            serde_json::from_str(content.lines().nth(1).unwrap()).unwrap();
        assert_eq!(response["excerpt"].as_str().unwrap().len(), EXCERPT_LEN);
    }
}
