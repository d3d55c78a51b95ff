//! Job lifecycle events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of the orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Nothing has started yet.
    Idle,
    /// Input layers are being checked and uploaded.
    Uploading,
    /// The scenario payload is being submitted and executed.
    Submitting,
    /// The remote job status is being polled.
    Polling,
    /// Output files are being downloaded.
    Retrieving,
    /// The local result has been built.
    Assembled,
    /// The run was cancelled.
    Cancelled,
    /// The run failed.
    Failed,
}

impl JobPhase {
    /// Whether no further transition can happen from this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Assembled | Self::Cancelled | Self::Failed)
    }

    /// Return the phase as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Retrieving => "retrieving",
            Self::Assembled => "assembled",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events published during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The orchestrator moved to a new phase.
    PhaseChanged {
        /// Previous phase.
        from: JobPhase,
        /// New phase.
        to: JobPhase,
    },
    /// A layer part finished uploading.
    PartUploaded {
        /// Local path of the layer.
        path: String,
        /// Part number just uploaded (1-based).
        part_number: u32,
        /// Total parts for the file.
        total_parts: u32,
    },
    /// The remote job accepted the submission.
    Submitted {
        /// Remote job identifier.
        job_id: Uuid,
    },
    /// A status payload was received.
    StatusUpdate {
        /// Remote status string.
        status: String,
        /// Server-reported progress percentage.
        progress: f64,
        /// Log entries first seen in this update.
        new_logs: Vec<String>,
    },
    /// A download batch completed.
    DownloadBatch {
        /// 1-based batch number.
        batch: u32,
        /// Files still missing after the batch.
        missing: usize,
    },
}
