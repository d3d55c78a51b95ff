//! Remote job status.

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted but not yet picked up.
    NotStarted,
    /// Executing.
    Running,
    /// Finished with outputs available.
    Completed,
    /// Cancelled by a client.
    Cancelled,
    /// Stopped by the service.
    Stopped,
    /// Failed on the service.
    Error,
}

impl JobStatus {
    /// Parse a server status string, case-insensitively.
    ///
    /// Returns `None` for strings the client does not know about.
    pub fn from_remote(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "not_started" | "queued" | "pending" => Some(Self::NotStarted),
            "running" | "started" | "in_progress" => Some(Self::Running),
            "completed" | "done" | "finished" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "stopped" => Some(Self::Stopped),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether the job cannot change status anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Stopped | Self::Error
        )
    }

    /// Whether the job ended without usable outputs.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Stopped | Self::Error)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
