//! In-memory fakes of the remote service and blob store.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use scenario_client::api::RemoteApi;
use scenario_client::blob::{BlobTransport, PartResponse};
use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_core::types::id::{LayerId, RemoteJobId};
use scenario_entity::wire::{
    AbortUploadRequest, CheckLayersResponse, FinishUploadRequest, FinishUploadResponse,
    OutputListResponse, ScenarioPayload, StartUploadRequest, StartUploadResponse, StatusPayload,
    SubmitResponse, UploadUrl,
};

#[derive(Debug, Default)]
pub struct FakeBlob {
    puts: Mutex<Vec<(String, usize)>>,
    put_failures: Mutex<HashMap<String, u32>>,
    no_etag: Mutex<HashSet<String>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    download_failures: Mutex<HashMap<String, u32>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeBlob {
    pub fn fail_puts(&self, url: &str, times: u32) {
        self.put_failures.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn omit_etag(&self, url: &str) {
        self.no_etag.lock().unwrap().insert(url.to_string());
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn put_urls(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn serve(&self, url: &str, body: &[u8]) {
        self.contents.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    pub fn fail_downloads(&self, url: &str, times: u32) {
        self.download_failures.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

fn take_failure(map: &Mutex<HashMap<String, u32>>, url: &str) -> bool {
    let mut map = map.lock().unwrap();
    match map.get_mut(url) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl BlobTransport for FakeBlob {
    async fn put_part(&self, url: &str, body: Bytes) -> AppResult<PartResponse> {
        let n = {
            let mut puts = self.puts.lock().unwrap();
            puts.push((url.to_string(), body.len()));
            puts.len()
        };
        if take_failure(&self.put_failures, url) {
            return Ok(PartResponse {
                status: 500,
                etag: None,
            });
        }
        let etag = if self.no_etag.lock().unwrap().contains(url) {
            None
        } else {
            Some(format!("\"etag-{n}\""))
        };
        Ok(PartResponse { status: 200, etag })
    }

    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64> {
        self.downloads.lock().unwrap().push(url.to_string());
        if take_failure(&self.download_failures, url) {
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

#[derive(Debug, Default)]
pub struct FakeApi {
    calls: Mutex<Vec<String>>,
    available: Mutex<HashSet<LayerId>>,
    started: Mutex<Vec<StartUploadRequest>>,
    finished: Mutex<Vec<(LayerId, FinishUploadRequest)>>,
    names: Mutex<HashMap<LayerId, String>>,
    fail_finish: Mutex<HashSet<String>>,
}

impl FakeApi {
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn mark_available(&self, layer: LayerId) {
        self.available.lock().unwrap().insert(layer);
    }

    pub fn forget(&self, layer: LayerId) {
        self.available.lock().unwrap().remove(&layer);
    }

    pub fn started(&self) -> Vec<StartUploadRequest> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<(LayerId, FinishUploadRequest)> {
        self.finished.lock().unwrap().clone()
    }

    pub fn fail_finish_for(&self, name: &str) {
        self.fail_finish.lock().unwrap().insert(name.to_string());
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn start_upload(&self, request: &StartUploadRequest) -> AppResult<StartUploadResponse> {
        self.record("start_upload");
        self.started.lock().unwrap().push(request.clone());
        let layer = LayerId::new();
        self.names.lock().unwrap().insert(layer, request.name.clone());
        let upload_urls = (1..=request.number_of_parts)
            .map(|n| UploadUrl {
                url: format!("https://blob/{layer}/{n}"),
                part_number: n,
            })
            .collect();
        Ok(StartUploadResponse {
            uuid: layer,
            multipart_upload_id: format!("mp-{layer}"),
            upload_urls,
        })
    }

    async fn finish_upload(
        &self,
        layer: LayerId,
        request: &FinishUploadRequest,
    ) -> AppResult<FinishUploadResponse> {
        self.record("finish_upload");
        let name = self.names.lock().unwrap().get(&layer).cloned().unwrap_or_default();
        if self.fail_finish.lock().unwrap().remove(&name) {
            return Err(AppError::http("finish layer upload", 500, "finish failed"));
        }
        self.finished.lock().unwrap().push((layer, request.clone()));
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

    async fn delete_layer(&self, layer: LayerId) -> AppResult<()> {
        self.record("delete_layer");
        self.available.lock().unwrap().remove(&layer);
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

    async fn submit_scenario(&self, _payload: &ScenarioPayload) -> AppResult<(u16, SubmitResponse)> {
        self.record("submit_scenario");
        Ok((
            201,
            SubmitResponse {
                uuid: Some(RemoteJobId::new()),
                detail: None,
            },
        ))
    }

    async fn execute_scenario(&self, _job: RemoteJobId) -> AppResult<u16> {
        self.record("execute_scenario");
        Ok(201)
    }

    async fn scenario_status(&self, _job: RemoteJobId) -> AppResult<StatusPayload> {
        self.record("scenario_status");
        Ok(StatusPayload {
            status: "Completed".into(),
            progress: Some(100.0),
            logs: None,
        })
    }

    async fn cancel_scenario(&self, _job: RemoteJobId) -> AppResult<()> {
        self.record("cancel_scenario");
        Ok(())
    }

    async fn scenario_detail(&self, _job: RemoteJobId) -> AppResult<Value> {
        self.record("scenario_detail");
        Ok(Value::Null)
    }

    async fn list_outputs(&self, _job: RemoteJobId) -> AppResult<OutputListResponse> {
        self.record("list_outputs");
        Ok(OutputListResponse::default())
    }
}
