//! Makes every referenced layer available remotely, uploading only what
//! the service is missing.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::future::join_all;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use scenario_cache::layer::{LayerCacheStore, normalize_path};
use scenario_client::api::RemoteApi;
use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_core::types::id::LayerId;
use scenario_entity::upload::{LayerRole, UploadRecord, UploadResult};
use scenario_entity::wire::{AbortUploadRequest, FinishUploadRequest, StartUploadRequest};

use crate::chunked::{ChunkPlan, ChunkUploader};
use crate::error::TransferError;
use crate::metrics::TransferMetrics;

/// Progress after one part was acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    /// Local path of the file.
    pub path: PathBuf,
    /// Part just uploaded.
    pub part_number: u32,
    /// Parts of this file.
    pub total_parts: u32,
    /// Fraction of all bytes of this run acknowledged so far, `0.0..=1.0`.
    pub fraction: f64,
}

/// Uploads the layers the remote service does not have yet.
#[derive(Debug, Clone)]
pub struct LayerUploadCoordinator {
    api: Arc<dyn RemoteApi>,
    uploader: ChunkUploader,
    cache: LayerCacheStore,
    chunk_size: u64,
    concurrency: usize,
    metrics: Arc<TransferMetrics>,
}

/// A file that needs a fresh upload.
struct PendingUpload<'a> {
    path: &'a Path,
    key: String,
    role: LayerRole,
    size: Option<u64>,
}

/// Shared state of one `upload_missing_layers` call.
struct RunContext<'a> {
    cancel: &'a CancellationToken,
    on_progress: &'a (dyn Fn(UploadProgress) + Send + Sync),
    total_bytes: u64,
    done_bytes: AtomicU64,
}

impl LayerUploadCoordinator {
    /// Create a coordinator. `concurrency` is the number of files uploaded
    /// at once; parts of one file are always sequential.
    pub fn new(
        api: Arc<dyn RemoteApi>,
        uploader: ChunkUploader,
        cache: LayerCacheStore,
        chunk_size: u64,
        concurrency: usize,
        metrics: Arc<TransferMetrics>,
    ) -> Self {
        Self {
            api,
            uploader,
            cache,
            chunk_size,
            concurrency: concurrency.max(1),
            metrics,
        }
    }

    /// Make every path available remotely and report the outcome per path.
    ///
    /// Paths with a confirmed remote layer are returned as cached without
    /// moving bytes. Interrupted uploads are aborted remotely (best effort)
    /// and restarted from scratch. A failure of one file never stops the
    /// others; only a failed availability check fails the whole call.
    #[instrument(skip_all, fields(files = paths.len()))]
    pub async fn upload_missing_layers(
        &self,
        paths: &BTreeMap<PathBuf, LayerRole>,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> AppResult<BTreeMap<PathBuf, UploadResult>> {
        let mut results = BTreeMap::new();
        let mut known: Vec<(&Path, String, LayerRole, UploadRecord)> = Vec::new();
        let mut pending: Vec<PendingUpload<'_>> = Vec::new();

        for (path, role) in paths {
            let key = normalize_path(path);
            match self.cache.load(&key).await? {
                Some(record) if record.layer_id.is_some() => known.push((path, key, *role, record)),
                _ => pending.push(PendingUpload {
                    path,
                    key,
                    role: *role,
                    size: None,
                }),
            }
        }

        let rejected = self.check_known(&known).await?;

        for (path, key, role, record) in known {
            let Some(layer_id) = record.layer_id else {
                continue;
            };
            if record.is_in_flight() {
                info!(path = %key, layer_id = %layer_id, "Found interrupted upload, restarting");
                self.abort_stale(layer_id, &record).await;
            } else if rejected.contains(&layer_id) {
                info!(path = %key, layer_id = %layer_id, "Cached layer no longer usable remotely");
            } else {
                debug!(path = %key, layer_id = %layer_id, "Layer already available");
                self.metrics.record_layer_cached();
                results.insert(path.to_path_buf(), UploadResult::Cached { layer_id });
                continue;
            }
            pending.push(PendingUpload {
                path,
                key,
                role,
                size: None,
            });
        }

        for item in &mut pending {
            item.size = tokio::fs::metadata(item.path)
                .await
                .ok()
                .filter(|m| m.is_file())
                .map(|m| m.len());
        }

        let ctx = RunContext {
            cancel,
            on_progress,
            total_bytes: pending.iter().filter_map(|p| p.size).sum(),
            done_bytes: AtomicU64::new(0),
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tasks = pending.iter().map(|item| {
            let semaphore = semaphore.clone();
            let ctx = &ctx;
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.upload_one(item, ctx).await,
                    Err(_) => UploadResult::Failed {
                        error: AppError::internal("Upload worker pool closed"),
                    },
                };
                (item.path.to_path_buf(), result)
            }
        });
        for (path, result) in join_all(tasks).await {
            results.insert(path, result);
        }

        Ok(results)
    }

    async fn check_known(
        &self,
        known: &[(&Path, String, LayerRole, UploadRecord)],
    ) -> AppResult<HashSet<LayerId>> {
        let ids: Vec<LayerId> = known
            .iter()
            .filter(|(_, _, _, r)| !r.is_in_flight())
            .filter_map(|(_, _, _, r)| r.layer_id)
            .collect();
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let response = self.api.check_layers(&ids).await?;
        Ok(ids.into_iter().filter(|id| response.needs_upload(id)).collect())
    }

    async fn abort_stale(&self, layer_id: LayerId, record: &UploadRecord) {
        let Some(upload_id) = record.upload_id.clone() else {
            return;
        };
        let request = AbortUploadRequest {
            multipart_upload_id: upload_id,
        };
        if let Err(e) = self.api.abort_upload(layer_id, &request).await {
            warn!(layer_id = %layer_id, error = %e, "Failed to abort stale upload");
        }
    }

    #[instrument(skip_all, fields(path = %item.key, role = %item.role))]
    async fn upload_one(&self, item: &PendingUpload<'_>, ctx: &RunContext<'_>) -> UploadResult {
        if ctx.cancel.is_cancelled() {
            return UploadResult::Cancelled;
        }
        let Some(size) = item.size else {
            return failed(TransferError::FileNotFound {
                path: item.path.to_path_buf(),
            });
        };
        let plan = match ChunkPlan::new(size, self.chunk_size) {
            Ok(plan) => plan,
            Err(e) => return failed(e),
        };

        let request = StartUploadRequest {
            layer_type: 0,
            component_type: item.role,
            name: item
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.key.clone()),
            size,
            number_of_parts: plan.part_count(),
            privacy_type: "private".to_string(),
        };
        let started = match self.api.start_upload(&request).await {
            Ok(started) => started,
            Err(e) => return UploadResult::Failed { error: e },
        };
        let layer_id = started.uuid;

        let record = UploadRecord::started(
            item.key.clone(),
            item.role,
            layer_id,
            started.multipart_upload_id.clone(),
            size,
        );
        if let Err(e) = self.cache.save(&record).await {
            return UploadResult::Failed { error: e };
        }
        info!(layer_id = %layer_id, parts = plan.part_count(), size, "Upload started");

        let mut file = match File::open(item.path).await {
            Ok(file) => file,
            Err(e) => return UploadResult::Failed { error: e.into() },
        };

        let mut parts = Vec::with_capacity(plan.part_count() as usize);
        for (part_number, range) in plan.parts() {
            if ctx.cancel.is_cancelled() {
                self.discard_new_layer(&item.key, layer_id).await;
                return UploadResult::Cancelled;
            }

            let Some(url) = started.url_for(part_number) else {
                return failed(TransferError::MissingPartUrl { part_number });
            };

            let mut buf = vec![0u8; (range.end - range.start) as usize];
            if let Err(e) = file.read_exact(&mut buf).await {
                return UploadResult::Failed { error: e.into() };
            }
            let len = buf.len() as u64;

            let part = match self.uploader.upload_part(url, Bytes::from(buf), part_number).await {
                Ok(part) => part,
                Err(e) => return failed(e),
            };

            let persisted = self
                .cache
                .update(&item.key, |r| {
                    r.map(|mut r| {
                        r.push_part(part.clone());
                        r
                    })
                })
                .await;
            if let Err(e) = persisted {
                return UploadResult::Failed { error: e };
            }
            parts.push(part);

            let done = ctx.done_bytes.fetch_add(len, Ordering::Relaxed) + len;
            let fraction = if ctx.total_bytes == 0 {
                1.0
            } else {
                (done as f64 / ctx.total_bytes as f64).min(1.0)
            };
            (ctx.on_progress)(UploadProgress {
                path: item.path.to_path_buf(),
                part_number,
                total_parts: plan.part_count(),
                fraction,
            });
        }

        let finish = FinishUploadRequest {
            multipart_upload_id: started.multipart_upload_id.clone(),
            items: parts,
        };
        if let Err(e) = self.api.finish_upload(layer_id, &finish).await {
            warn!(layer_id = %layer_id, error = %e, "Finishing upload failed");
            return UploadResult::Failed { error: e };
        }

        let completed = self
            .cache
            .update(&item.key, |r| {
                r.map(|mut r| {
                    r.complete();
                    r
                })
            })
            .await;
        if let Err(e) = completed {
            return UploadResult::Failed { error: e };
        }

        self.metrics.record_layer_uploaded();
        info!(layer_id = %layer_id, "Upload finished");
        UploadResult::Uploaded { layer_id }
    }

    /// Remove a layer created in this run after cancellation.
    ///
    /// The partial multipart upload itself is left for the server to expire.
    async fn discard_new_layer(&self, key: &str, layer_id: LayerId) {
        info!(path = key, layer_id = %layer_id, "Upload cancelled, removing new layer");
        if let Err(e) = self.api.delete_layer(layer_id).await {
            warn!(layer_id = %layer_id, error = %e, "Failed to delete cancelled layer");
        }
        if let Err(e) = self.cache.remove(key).await {
            warn!(path = key, error = %e, "Failed to remove upload record");
        }
    }
}

fn failed(err: TransferError) -> UploadResult {
    UploadResult::Failed { error: err.into() }
}
