//! Polls a remote job until it reaches a terminal status.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use scenario_client::api::RemoteApi;
use scenario_core::config::polling::PollingConfig;
use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_entity::job::{JobHandle, JobStatus};
use scenario_entity::wire::StatusPayload;

/// Fixed-interval status poller with an iteration ceiling.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    api: Arc<dyn RemoteApi>,
    interval: Duration,
    max_checks: u32,
}

impl StatusPoller {
    /// Create a poller.
    pub fn new(api: Arc<dyn RemoteApi>, interval: Duration, max_checks: u32) -> Self {
        Self {
            api,
            interval,
            max_checks: max_checks.max(1),
        }
    }

    /// Create a poller from the `polling` configuration section.
    pub fn from_config(api: Arc<dyn RemoteApi>, config: &PollingConfig) -> Self {
        Self::new(
            api,
            Duration::from_secs(config.interval_seconds),
            config.max_checks,
        )
    }

    /// Fetch the status until it is terminal and return the last payload.
    ///
    /// `on_update` runs after every fetch with the updated handle and the
    /// log entries first seen in that fetch. Cancellation is checked before
    /// each fetch and interrupts the sleep; the remote job is not touched.
    /// After `max_checks` fetches without a terminal status the call fails
    /// with a poll timeout.
    #[instrument(skip_all, fields(job_id = %handle.job_id))]
    pub async fn poll_until_terminal(
        &self,
        handle: &mut JobHandle,
        cancel: &CancellationToken,
        on_update: &mut (dyn FnMut(&JobHandle, &[Value]) + Send),
    ) -> AppResult<StatusPayload> {
        let mut checks = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(AppError::cancelled("Status polling cancelled"));
            }

            let payload = self.api.scenario_status(handle.job_id).await?;
            checks += 1;

            let status = JobStatus::from_remote(&payload.status).unwrap_or_else(|| {
                warn!(status = %payload.status, "Unknown job status, treating as running");
                JobStatus::Running
            });
            let progress = payload.progress.unwrap_or(handle.progress);
            let logs = payload.logs.as_deref().unwrap_or_default();
            let fresh = handle.apply(status, progress, logs);
            debug!(check = checks, status = %status, progress, new_logs = fresh.len(), "Job status");

            on_update(handle, &fresh);

            if status.is_terminal() {
                return Ok(payload);
            }
            if checks >= self.max_checks {
                return Err(AppError::poll_timeout(format!(
                    "Job {} not finished after {checks} status checks",
                    handle.job_id
                )));
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
