//! Host task trait: the cancellable unit the orchestrator runs inside.

use serde::{Deserialize, Serialize};

/// Final outcome reported to the host exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "lowercase")]
pub enum TaskOutcome {
    /// Results are available.
    Succeeded,
    /// The run stopped because cancellation was requested.
    Cancelled,
    /// The run stopped because of an error.
    Failed(String),
}

/// The background task host the orchestrator reports to.
///
/// Implementations must be cheap to call from any task; the orchestrator
/// calls `set_progress` after every uploaded part and every status check.
pub trait TaskHost: Send + Sync + std::fmt::Debug + 'static {
    /// Report overall progress in the range `0.0..=100.0`.
    fn set_progress(&self, percent: f64);

    /// Whether the surrounding application asked the task to stop.
    fn is_cancelled(&self) -> bool;

    /// Surface a message; `notify_user` marks messages meant for the analyst.
    fn notify(&self, message: &str, notify_user: bool);

    /// Called once when the run ends.
    fn finished(&self, outcome: TaskOutcome);
}
