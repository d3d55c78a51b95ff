//! Shared fixtures for scenario-job integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use scenario_cache::layer::{LayerCacheStore, normalize_path};
use scenario_cache::memory::MemoryStore;
use scenario_client::api::RemoteApi;
use scenario_client::blob::{BlobTransport, PartResponse};
use scenario_core::config::AppConfig;
use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_core::traits::task::{TaskHost, TaskOutcome};
use scenario_core::types::id::{LayerId, RemoteJobId, ScenarioId};
use scenario_entity::scenario::{Activity, Pathway, Scenario, SpatialExtent};
use scenario_entity::upload::{LayerRole, UploadRecord};
use scenario_entity::wire::{
    AbortUploadRequest, CheckLayersResponse, FinishUploadRequest, FinishUploadResponse,
    OutputEntry, OutputListResponse, ScenarioPayload, StartUploadRequest, StartUploadResponse,
    StatusPayload, SubmitResponse, UploadUrl,
};
use scenario_job::orchestrator::JobServices;

/// Scripted compute service.
#[derive(Debug)]
pub struct FakeRemote {
    pub job_id: RemoteJobId,
    calls: Mutex<Vec<String>>,
    available: Mutex<HashSet<LayerId>>,
    statuses: Mutex<VecDeque<StatusPayload>>,
    submit_status: Mutex<u16>,
    execute_status: Mutex<u16>,
    detail: Mutex<Value>,
    outputs: Mutex<Vec<OutputEntry>>,
    submitted: Mutex<Vec<ScenarioPayload>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            job_id: RemoteJobId::new(),
            calls: Mutex::new(Vec::new()),
            available: Mutex::new(HashSet::new()),
            statuses: Mutex::new(VecDeque::new()),
            submit_status: Mutex::new(201),
            execute_status: Mutex::new(201),
            detail: Mutex::new(json!({ "activities": [] })),
            outputs: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn mark_available(&self, layer: LayerId) {
        self.available.lock().unwrap().insert(layer);
    }

    /// Queue status payloads; the last one repeats forever.
    pub fn script_statuses(&self, statuses: Vec<StatusPayload>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }

    pub fn set_submit_status(&self, status: u16) {
        *self.submit_status.lock().unwrap() = status;
    }

    pub fn set_execute_status(&self, status: u16) {
        *self.execute_status.lock().unwrap() = status;
    }

    pub fn set_detail(&self, detail: Value) {
        *self.detail.lock().unwrap() = detail;
    }

    pub fn set_outputs(&self, outputs: Vec<OutputEntry>) {
        *self.outputs.lock().unwrap() = outputs;
    }

    pub fn submitted(&self) -> Vec<ScenarioPayload> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn start_upload(&self, request: &StartUploadRequest) -> AppResult<StartUploadResponse> {
        self.record("start_upload");
        let layer = LayerId::new();
        Ok(StartUploadResponse {
            uuid: layer,
            multipart_upload_id: format!("mp-{layer}"),
            upload_urls: (1..=request.number_of_parts)
                .map(|n| UploadUrl {
                    url: format!("https://blob/{layer}/{n}"),
                    part_number: n,
                })
                .collect(),
        })
    }

    async fn finish_upload(
        &self,
        layer: LayerId,
        _request: &FinishUploadRequest,
    ) -> AppResult<FinishUploadResponse> {
        self.record("finish_upload");
        self.available.lock().unwrap().insert(layer);
        Ok(FinishUploadResponse {
            uuid: layer,
            status: Some("ready".into()),
        })
    }

    async fn abort_upload(&self, _layer: LayerId, _request: &AbortUploadRequest) -> AppResult<()> {
        self.record("abort_upload");
        Ok(())
    }

    async fn delete_layer(&self, _layer: LayerId) -> AppResult<()> {
        self.record("delete_layer");
        Ok(())
    }

    async fn check_layers(&self, layers: &[LayerId]) -> AppResult<CheckLayersResponse> {
        self.record("check_layers");
        let available = self.available.lock().unwrap();
        Ok(CheckLayersResponse {
            unavailable: layers
                .iter()
                .filter(|l| !available.contains(l))
                .map(ToString::to_string)
                .collect(),
            invalid: vec![],
        })
    }

    async fn submit_scenario(&self, payload: &ScenarioPayload) -> AppResult<(u16, SubmitResponse)> {
        self.record("submit_scenario");
        self.submitted.lock().unwrap().push(payload.clone());
        let status = *self.submit_status.lock().unwrap();
        if status == 201 {
            Ok((
                201,
                SubmitResponse {
                    uuid: Some(self.job_id),
                    detail: None,
                },
            ))
        } else {
            Err(AppError::http(
                "submit scenario",
                status,
                r#"{"detail":"Invalid extent"}"#,
            ))
        }
    }

    async fn execute_scenario(&self, _job: RemoteJobId) -> AppResult<u16> {
        self.record("execute_scenario");
        Ok(*self.execute_status.lock().unwrap())
    }

    async fn scenario_status(&self, _job: RemoteJobId) -> AppResult<StatusPayload> {
        self.record("scenario_status");
        let mut statuses = self.statuses.lock().unwrap();
        let payload = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(payload.unwrap_or_else(|| status("running", 0.0, &[])))
    }

    async fn cancel_scenario(&self, _job: RemoteJobId) -> AppResult<()> {
        self.record("cancel_scenario");
        Ok(())
    }

    async fn scenario_detail(&self, _job: RemoteJobId) -> AppResult<Value> {
        self.record("scenario_detail");
        Ok(self.detail.lock().unwrap().clone())
    }

    async fn list_outputs(&self, _job: RemoteJobId) -> AppResult<OutputListResponse> {
        self.record("list_outputs");
        Ok(OutputListResponse {
            results: self.outputs.lock().unwrap().clone(),
        })
    }
}

/// Blob store serving fixed output bodies.
#[derive(Debug, Default)]
pub struct FakeBlob {
    puts: Mutex<Vec<String>>,
    contents: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<String>>,
    cancel_on_download: Mutex<Option<CancellationToken>>,
}

impl FakeBlob {
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.contents.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }

    /// Cancel `token` and fail the first download that is attempted.
    pub fn cancel_on_first_download(&self, token: CancellationToken) {
        *self.cancel_on_download.lock().unwrap() = Some(token);
    }
}

#[async_trait]
impl BlobTransport for FakeBlob {
    async fn put_part(&self, url: &str, _body: Bytes) -> AppResult<PartResponse> {
        let n = {
            let mut puts = self.puts.lock().unwrap();
            puts.push(url.to_string());
            puts.len()
        };
        Ok(PartResponse {
            status: 200,
            etag: Some(format!("\"etag-{n}\"")),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64> {
        self.downloads.lock().unwrap().push(url.to_string());
        if let Some(token) = self.cancel_on_download.lock().unwrap().take() {
            token.cancel();
            return Err(AppError::http("download output", 503, "busy"));
        }
        let body = self
            .contents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::http("download output", 404, "missing"))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

/// Host recording everything the job reports.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub cancel: CancellationToken,
    progress: Mutex<Vec<f64>>,
    notes: Mutex<Vec<String>>,
    outcomes: Mutex<Vec<TaskOutcome>>,
}

impl RecordingHost {
    pub fn progress(&self) -> Vec<f64> {
        self.progress.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<TaskOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl TaskHost for RecordingHost {
    fn set_progress(&self, percent: f64) {
        self.progress.lock().unwrap().push(percent);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn notify(&self, message: &str, _notify_user: bool) {
        self.notes.lock().unwrap().push(message.to_string());
    }

    fn finished(&self, outcome: TaskOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }
}

pub fn status(status: &str, progress: f64, logs: &[&str]) -> StatusPayload {
    StatusPayload {
        status: status.to_string(),
        progress: Some(progress),
        logs: Some(logs.iter().map(|l| json!(l)).collect()),
    }
}

/// Everything an orchestrator test needs.
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub blob: Arc<FakeBlob>,
    pub store: Arc<MemoryStore>,
    pub host: Arc<RecordingHost>,
    pub config: AppConfig,
    pub inputs: tempfile::TempDir,
    pub output: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.transfer.chunk_size_bytes = 4;
        config.transfer.backoff_base_millis = 1;
        config.polling.interval_seconds = 5;
        Self {
            remote: Arc::new(FakeRemote::new()),
            blob: Arc::new(FakeBlob::default()),
            store: Arc::new(MemoryStore::new()),
            host: Arc::new(RecordingHost::default()),
            config,
            inputs: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
        }
    }

    pub fn services(&self) -> JobServices {
        JobServices {
            api: self.remote.clone(),
            blob: self.blob.clone(),
            store: self.store.clone(),
            host: self.host.clone(),
        }
    }

    pub fn input(&self, name: &str, len: usize) -> PathBuf {
        let path = self.inputs.path().join(name);
        std::fs::write(&path, vec![1u8; len]).unwrap();
        path
    }

    /// Pretend `path` was uploaded in an earlier run as `layer`.
    pub async fn cache_layer(&self, path: &Path, layer: LayerId) {
        let cache = LayerCacheStore::new(self.store.clone());
        let mut record = UploadRecord::started(normalize_path(path), LayerRole::Pathway, layer, "mp-old", 1);
        record.complete();
        cache.save(&record).await.unwrap();
        self.remote.mark_available(layer);
    }

    /// Serve an output file and declare it in the listing.
    pub fn output_file(&self, filename: &str, group: &str, is_final: bool) -> OutputEntry {
        let url = format!("https://blob/out/{group}/{filename}");
        self.blob.serve(&url, filename.as_bytes());
        OutputEntry {
            url,
            filename: filename.to_string(),
            group: (!group.is_empty()).then(|| group.to_string()),
            is_final_output: is_final,
            output_meta: is_final.then(|| json!({ "total_area": 42.0 })),
        }
    }
}

/// Two activities over three input files.
pub fn two_activity_scenario(p1: &Path, c1: &Path, p2: &Path) -> Scenario {
    Scenario {
        uuid: ScenarioId::new(),
        server_uuid: None,
        name: "Coastal restoration".into(),
        description: "Two activities".into(),
        extent: SpatialExtent {
            bbox: [30.0, 31.0, -25.0, -24.0],
            crs: "EPSG:4326".into(),
        },
        activities: vec![
            Activity {
                uuid: Uuid::new_v4(),
                name: "Agroforestry".into(),
                description: String::new(),
                path: None,
                pathways: vec![Pathway {
                    uuid: Uuid::new_v4(),
                    name: "Agroforestry pathway".into(),
                    description: String::new(),
                    path: p1.to_path_buf(),
                    carbon_paths: vec![c1.to_path_buf()],
                }],
                priority_layers: vec![],
                mask_paths: vec![],
            },
            Activity {
                uuid: Uuid::new_v4(),
                name: "Restoration".into(),
                description: String::new(),
                path: None,
                pathways: vec![Pathway {
                    uuid: Uuid::new_v4(),
                    name: "Restoration pathway".into(),
                    description: String::new(),
                    path: p2.to_path_buf(),
                    carbon_paths: vec![],
                }],
                priority_layers: vec![],
                mask_paths: vec![],
            },
        ],
        priority_layer_groups: vec![],
        parameters: Default::default(),
    }
}

/// Detail document the service would return for `scenario`.
pub fn detail_for(scenario: &Scenario) -> Value {
    let activities: Vec<Value> = scenario
        .activities
        .iter()
        .enumerate()
        .map(|(i, a)| {
            json!({
                "uuid": a.uuid,
                "name": a.name,
                "description": a.description,
                "path": format!("/remote/tmp/activity_{i}.tif"),
                "pathways": a.pathways.iter().enumerate().map(|(j, p)| json!({
                    "uuid": p.uuid,
                    "name": p.name,
                    "path": format!("/remote/layers/pathway_{i}_{j}.tif"),
                    "layer_uuid": Uuid::new_v4(),
                    "carbon_paths": [],
                    "carbon_uuids": [],
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "uuid": Uuid::new_v4(), "name": scenario.name, "activities": activities })
}
