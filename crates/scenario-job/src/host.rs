//! Task host that reports through `tracing`.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scenario_core::traits::task::{TaskHost, TaskOutcome};

/// Headless [`TaskHost`] for the runner binary.
///
/// Cancellation is driven by the owned [`CancellationToken`]; the outcome
/// is kept so the caller can read it once the job returns.
#[derive(Debug, Default)]
pub struct TracingTaskHost {
    cancel: CancellationToken,
    progress: Mutex<f64>,
    outcome: Mutex<Option<TaskOutcome>>,
}

impl TracingTaskHost {
    /// Create a host with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels the hosted task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Last reported progress.
    pub fn progress(&self) -> f64 {
        self.progress.lock().map(|p| *p).unwrap_or_default()
    }

    /// Outcome reported by `finished`, if any.
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome.lock().ok().and_then(|o| o.clone())
    }
}

impl TaskHost for TracingTaskHost {
    fn set_progress(&self, percent: f64) {
        if let Ok(mut progress) = self.progress.lock() {
            // only log whole-percent steps
            if percent.floor() > progress.floor() {
                debug!(progress = percent.floor(), "Progress");
            }
            *progress = percent;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn notify(&self, message: &str, notify_user: bool) {
        if notify_user {
            info!(target: "scenario_runner::user", "{message}");
        } else {
            debug!("{message}");
        }
    }

    fn finished(&self, outcome: TaskOutcome) {
        match &outcome {
            TaskOutcome::Succeeded => info!("Remote scenario run succeeded"),
            TaskOutcome::Cancelled => warn!("Remote scenario run cancelled"),
            TaskOutcome::Failed(message) => error!(error = %message, "Remote scenario run failed"),
        }
        if let Ok(mut slot) = self.outcome.lock() {
            *slot = Some(outcome);
        }
    }
}
