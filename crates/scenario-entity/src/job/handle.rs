//! Client-side view of one remote job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scenario_core::types::id::RemoteJobId;

use super::status::JobStatus;

/// Accumulated state of a remote job, updated from status payloads.
///
/// Log entries are deduplicated by content and kept in server order.
/// Once the status is terminal the handle no longer changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    /// Remote job identifier.
    pub job_id: RemoteJobId,
    /// Last observed status.
    pub status: JobStatus,
    /// Last observed progress percentage.
    pub progress: f64,
    /// Every distinct log entry seen so far.
    pub logs: Vec<Value>,
}

impl JobHandle {
    /// Create a handle for a freshly submitted job.
    pub fn new(job_id: RemoteJobId) -> Self {
        Self {
            job_id,
            status: JobStatus::NotStarted,
            progress: 0.0,
            logs: Vec::new(),
        }
    }

    /// Apply a status update and return the log entries not seen before.
    pub fn apply(&mut self, status: JobStatus, progress: f64, logs: &[Value]) -> Vec<Value> {
        if self.status.is_terminal() {
            return Vec::new();
        }
        self.status = status;
        if progress.is_finite() {
            self.progress = progress.clamp(0.0, 100.0);
        }
        let mut fresh = Vec::new();
        for entry in logs {
            if !self.logs.contains(entry) {
                self.logs.push(entry.clone());
                fresh.push(entry.clone());
            }
        }
        fresh
    }

    /// The last `n` log lines, rendered for messages.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.logs.len().saturating_sub(n);
        self.logs[start..].iter().map(log_line).collect()
    }
}

/// Render a log entry as one line.
///
/// Server entries are either plain strings or objects with a `log` field.
pub fn log_line(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("log").or_else(|| map.get("message")) {
            Some(Value::String(s)) => s.clone(),
            _ => entry.to_string(),
        },
        other => other.to_string(),
    }
}
