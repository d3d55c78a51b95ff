//! The remote job orchestrator.
//!
//! A [`Job`] runs the phases `Uploading -> Submitting -> Polling ->
//! Retrieving -> Assembled` strictly in sequence. Any error ends the run in
//! `Failed`; observed cancellation ends it in `Cancelled`. The host's
//! `finished` callback is invoked exactly once, when [`Job::run`] or
//! [`Job::resume`] returns.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use scenario_cache::layer::{LayerCacheStore, normalize_path};
use scenario_cache::pointer::RunningScenarioStore;
use scenario_client::api::RemoteApi;
use scenario_client::blob::BlobTransport;
use scenario_core::config::AppConfig;
use scenario_core::error::AppError;
use scenario_core::events::{EventEnvelope, JobEvent, JobPhase};
use scenario_core::result::AppResult;
use scenario_core::traits::store::KeyValueStore;
use scenario_core::traits::task::{TaskHost, TaskOutcome};
use scenario_core::types::id::RemoteJobId;
use scenario_core::types::pool::default_worker_pool_size;
use scenario_entity::job::{JobHandle, log_line};
use scenario_entity::output::OutputDescriptor;
use scenario_entity::scenario::{Scenario, ScenarioResult};
use scenario_entity::upload::UploadResult;
use scenario_transfer::chunked::ChunkUploader;
use scenario_transfer::coordinator::{LayerUploadCoordinator, UploadProgress};
use scenario_transfer::metrics::TransferMetrics;
use scenario_transfer::retriever::{OutputRetriever, RetrieveProgress};

use crate::assembler::ResultAssembler;
use crate::poller::StatusPoller;
use crate::progress;
use crate::submitter::{JobSubmitter, LayerMap};

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Log lines quoted in a remote failure message.
const FAILURE_LOG_TAIL: usize = 5;

/// Collaborators a [`Job`] needs.
#[derive(Debug, Clone)]
pub struct JobServices {
    /// Compute service API.
    pub api: Arc<dyn RemoteApi>,
    /// Presigned blob transfers.
    pub blob: Arc<dyn BlobTransport>,
    /// Persistent key-value store for checkpoints and the running pointer.
    pub store: Arc<dyn KeyValueStore>,
    /// Host the job reports to.
    pub host: Arc<dyn TaskHost>,
}

/// One remote execution of a scenario.
#[derive(Debug)]
pub struct Job {
    scenario: Scenario,
    output_dir: PathBuf,
    api: Arc<dyn RemoteApi>,
    host: Arc<dyn TaskHost>,
    coordinator: LayerUploadCoordinator,
    submitter: JobSubmitter,
    poller: StatusPoller,
    retriever: OutputRetriever,
    assembler: ResultAssembler,
    pointer: RunningScenarioStore,
    metrics: Arc<TransferMetrics>,
    cancel: CancellationToken,
    events: broadcast::Sender<EventEnvelope>,
    phase: JobPhase,
    handle: Option<JobHandle>,
}

impl Job {
    /// Build a job for `scenario`, downloading results under `output_dir`.
    pub fn new(
        scenario: Scenario,
        output_dir: impl Into<PathBuf>,
        services: JobServices,
        config: &AppConfig,
    ) -> Self {
        let metrics = Arc::new(TransferMetrics::new());
        let workers = default_worker_pool_size(config.transfer.max_concurrency);

        let uploader = ChunkUploader::from_config(services.blob.clone(), &config.transfer, metrics.clone());
        let coordinator = LayerUploadCoordinator::new(
            services.api.clone(),
            uploader,
            LayerCacheStore::new(services.store.clone()),
            config.transfer.chunk_size_bytes,
            workers,
            metrics.clone(),
        );
        let retriever = OutputRetriever::new(
            services.blob.clone(),
            workers,
            config.transfer.max_download_batches,
            metrics.clone(),
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            scenario,
            output_dir: output_dir.into(),
            api: services.api.clone(),
            host: services.host,
            coordinator,
            submitter: JobSubmitter::new(services.api.clone()),
            poller: StatusPoller::from_config(services.api, &config.polling),
            retriever,
            assembler: ResultAssembler::new(),
            pointer: RunningScenarioStore::new(services.store),
            metrics,
            cancel: CancellationToken::new(),
            events,
            phase: JobPhase::Idle,
            handle: None,
        }
    }

    /// Override the polling interval and check ceiling.
    pub fn with_poller(mut self, interval: Duration, max_checks: u32) -> Self {
        self.poller = StatusPoller::new(self.api.clone(), interval, max_checks);
        self
    }

    /// Token that cancels this job.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Subscribe to job events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Transfer counters of this job, shared with its workers.
    pub fn metrics(&self) -> Arc<TransferMetrics> {
        self.metrics.clone()
    }

    /// Run the whole pipeline from upload to assembled result.
    pub async fn run(mut self) -> AppResult<ScenarioResult> {
        let span = info_span!("remote_job", scenario = %self.scenario.uuid);
        async move {
            let result = self.drive(None).await;
            self.conclude(result).await
        }
        .instrument(span)
        .await
    }

    /// Attach to an already submitted job and continue from polling.
    pub async fn resume(mut self, job_id: RemoteJobId) -> AppResult<ScenarioResult> {
        let span = info_span!("remote_job", scenario = %self.scenario.uuid, job_id = %job_id);
        async move {
            info!("Resuming remote job");
            let result = self.drive(Some(job_id)).await;
            self.conclude(result).await
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self, resume: Option<RemoteJobId>) -> AppResult<ScenarioResult> {
        let job_id = match resume {
            Some(job_id) => job_id,
            None => {
                let layers = self.upload().await?;
                self.submit(&layers).await?
            }
        };
        self.scenario.server_uuid = Some(job_id);
        self.handle = Some(JobHandle::new(job_id));

        let result = self.poll_and_collect(job_id).await;
        if result.as_ref().is_err_and(AppError::is_cancelled) {
            self.cancel_remote(job_id).await;
        }
        result
    }

    async fn poll_and_collect(&mut self, job_id: RemoteJobId) -> AppResult<ScenarioResult> {
        self.poll().await?;
        let outputs = self.retrieve(job_id).await?;

        self.checkpoint()?;
        let detail = self.api.scenario_detail(job_id).await?;
        let (scenario, result) =
            self.assembler
                .assemble(&self.scenario, job_id, &detail, &outputs, &self.output_dir)?;
        self.scenario = scenario;
        self.transition(JobPhase::Assembled);
        self.host.set_progress(progress::ASSEMBLED);
        Ok(result)
    }

    async fn upload(&mut self) -> AppResult<LayerMap> {
        self.checkpoint()?;
        self.transition(JobPhase::Uploading);
        self.host.set_progress(0.0);

        let paths = self.scenario.layer_roles();
        let host = self.host.clone();
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let scenario_id = self.scenario.uuid.into_uuid();
        let on_progress = move |p: UploadProgress| {
            if host.is_cancelled() {
                cancel.cancel();
            }
            host.set_progress(progress::uploading(p.fraction));
            let _ = events.send(EventEnvelope::new(
                scenario_id,
                JobEvent::PartUploaded {
                    path: p.path.display().to_string(),
                    part_number: p.part_number,
                    total_parts: p.total_parts,
                },
            ));
        };

        let results = self
            .coordinator
            .upload_missing_layers(&paths, &self.cancel, &on_progress)
            .await?;

        if self.cancel.is_cancelled() || results.values().any(|r| matches!(r, UploadResult::Cancelled)) {
            return Err(AppError::cancelled("Layer upload cancelled"));
        }

        let failures: Vec<String> = results
            .iter()
            .filter_map(|(path, r)| match r {
                UploadResult::Failed { error } => Some(format!("{}: {}", path.display(), error.message)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            return Err(AppError::upload(format!(
                "{} layer(s) could not be uploaded: {}",
                failures.len(),
                failures.join("; ")
            )));
        }

        self.host.set_progress(progress::uploading(1.0));
        self.host
            .notify(&format!("{} input layer(s) available remotely", results.len()), false);

        Ok(results
            .iter()
            .filter_map(|(path, r)| r.layer_id().map(|id| (normalize_path(path), id)))
            .collect())
    }

    async fn submit(&mut self, layers: &LayerMap) -> AppResult<RemoteJobId> {
        self.checkpoint()?;
        self.transition(JobPhase::Submitting);

        let job_id = self.submitter.submit(&self.scenario, layers).await?;
        self.host.set_progress(progress::SUBMITTED);
        self.publish(JobEvent::Submitted {
            job_id: job_id.into_uuid(),
        });
        self.host
            .notify(&format!("Scenario submitted as remote job {job_id}"), true);

        if let Err(e) = self.pointer.set(self.scenario.uuid, job_id).await {
            warn!(error = %e, "Failed to record running scenario");
        }
        Ok(job_id)
    }

    async fn poll(&mut self) -> AppResult<()> {
        self.checkpoint()?;
        self.transition(JobPhase::Polling);

        let Some(mut handle) = self.handle.take() else {
            return Err(AppError::internal("Polling started without a job handle"));
        };
        let host = self.host.clone();
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let scenario_id = self.scenario.uuid.into_uuid();
        let mut on_update = move |h: &JobHandle, fresh: &[Value]| {
            if host.is_cancelled() {
                cancel.cancel();
            }
            host.set_progress(progress::polling(h.progress));
            let new_logs: Vec<String> = fresh.iter().map(log_line).collect();
            for line in &new_logs {
                host.notify(line, false);
            }
            let _ = events.send(EventEnvelope::new(
                scenario_id,
                JobEvent::StatusUpdate {
                    status: h.status.to_string(),
                    progress: h.progress,
                    new_logs,
                },
            ));
        };

        let outcome = self
            .poller
            .poll_until_terminal(&mut handle, &self.cancel, &mut on_update)
            .await;
        let status = handle.status;
        let tail = handle.tail(FAILURE_LOG_TAIL);
        let job_id = handle.job_id;
        self.handle = Some(handle);
        outcome?;

        if status.is_failure() {
            return Err(AppError::execution(format!(
                "Remote job {job_id} ended with status {status}: {}",
                tail.join(" | ")
            )));
        }
        self.host.notify("Remote job completed", true);
        Ok(())
    }

    async fn retrieve(&mut self, job_id: RemoteJobId) -> AppResult<scenario_transfer::RetrievedOutputs> {
        self.checkpoint()?;
        self.transition(JobPhase::Retrieving);

        let listing = self.api.list_outputs(job_id).await?;
        let descriptors: Vec<OutputDescriptor> =
            listing.results.into_iter().map(OutputDescriptor::from).collect();
        info!(outputs = descriptors.len(), "Retrieving outputs");
        self.host.set_progress(progress::retrieving(0, descriptors.len()));

        let host = self.host.clone();
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let scenario_id = self.scenario.uuid.into_uuid();
        let on_batch = move |p: RetrieveProgress| {
            if host.is_cancelled() {
                cancel.cancel();
            }
            host.set_progress(progress::retrieving(p.present, p.total));
            let _ = events.send(EventEnvelope::new(
                scenario_id,
                JobEvent::DownloadBatch {
                    batch: p.batch,
                    missing: p.total - p.present,
                },
            ));
        };

        self.retriever
            .retrieve(&descriptors, &self.output_dir, &self.cancel, &on_batch)
            .await
    }

    /// Ask the service to stop the job when its last known status was live.
    async fn cancel_remote(&self, job_id: RemoteJobId) {
        let live = self.handle.as_ref().is_none_or(|h| !h.status.is_terminal());
        if !live {
            return;
        }
        info!(job_id = %job_id, "Cancelling remote job");
        if let Err(e) = self.api.cancel_scenario(job_id).await {
            warn!(job_id = %job_id, error = %e, "Remote cancel failed");
        }
    }

    /// Fail with `Cancelled` when cancellation was requested.
    fn checkpoint(&self) -> AppResult<()> {
        if self.host.is_cancelled() {
            self.cancel.cancel();
        }
        if self.cancel.is_cancelled() {
            return Err(AppError::cancelled(format!(
                "Cancelled during {}",
                self.phase
            )));
        }
        Ok(())
    }

    fn transition(&mut self, to: JobPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        info!(from = %from, to = %to, "Job phase changed");
        self.publish(JobEvent::PhaseChanged { from, to });
    }

    fn publish(&self, event: JobEvent) {
        let _ = self
            .events
            .send(EventEnvelope::new(self.scenario.uuid.into_uuid(), event));
    }

    async fn conclude(&mut self, result: AppResult<ScenarioResult>) -> AppResult<ScenarioResult> {
        let outcome = match &result {
            Ok(_) => TaskOutcome::Succeeded,
            Err(e) if e.is_cancelled() => {
                self.transition(JobPhase::Cancelled);
                TaskOutcome::Cancelled
            }
            Err(e) => {
                error!(phase = %self.phase, error = %e, "Remote job failed");
                self.transition(JobPhase::Failed);
                TaskOutcome::Failed(e.to_string())
            }
        };

        let transfers = self.metrics.snapshot();
        info!(
            phase = %self.phase,
            parts_uploaded = transfers.parts_uploaded,
            part_failures = transfers.part_failures,
            bytes_uploaded = transfers.bytes_uploaded,
            layers_uploaded = transfers.layers_uploaded,
            layers_cached = transfers.layers_cached,
            files_downloaded = transfers.files_downloaded,
            download_failures = transfers.download_failures,
            download_batches = transfers.download_batches,
            "Transfer summary"
        );

        if self.scenario.server_uuid.is_some() {
            if let Err(e) = self.pointer.clear().await {
                warn!(error = %e, "Failed to clear running scenario");
            }
        }

        self.host.finished(outcome);
        result
    }
}
