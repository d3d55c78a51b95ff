//! Downloads the declared outputs of a run until all of them are on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use scenario_client::blob::BlobTransport;
use scenario_core::result::AppResult;
use scenario_entity::output::OutputDescriptor;

use crate::error::TransferError;
use crate::metrics::TransferMetrics;

/// Progress after a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveProgress {
    /// 1-based batch number.
    pub batch: u32,
    /// Files verified present.
    pub present: usize,
    /// Files declared.
    pub total: usize,
}

/// Everything the retriever put on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedOutputs {
    /// Local path of every declared output, in declaration order.
    pub paths: Vec<PathBuf>,
    /// Metadata of the final output, if one was declared.
    pub final_output_meta: Option<Value>,
    /// Local path of the final output.
    pub final_output_path: Option<PathBuf>,
    /// Download batches that ran.
    pub batches: u32,
}

/// Pause before re-requesting outputs that are still missing.
pub const DEFAULT_BATCH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Batch downloader with a verification pass after every batch.
#[derive(Debug, Clone)]
pub struct OutputRetriever {
    blob: Arc<dyn BlobTransport>,
    concurrency: usize,
    max_batches: Option<u32>,
    retry_delay: Duration,
    metrics: Arc<TransferMetrics>,
}

impl OutputRetriever {
    /// Create a retriever. `max_batches = None` retries until cancelled.
    pub fn new(
        blob: Arc<dyn BlobTransport>,
        concurrency: usize,
        max_batches: Option<u32>,
        metrics: Arc<TransferMetrics>,
    ) -> Self {
        Self {
            blob,
            concurrency: concurrency.max(1),
            max_batches,
            retry_delay: DEFAULT_BATCH_RETRY_DELAY,
            metrics,
        }
    }

    /// Override the pause between unsuccessful batches.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Download every descriptor under `root`.
    ///
    /// The final output is placed directly under `root`; other files under
    /// `root/<group>/`. Files already present are not downloaded again.
    #[instrument(skip_all, fields(root = %root.display(), outputs = descriptors.len()))]
    pub async fn retrieve(
        &self,
        descriptors: &[OutputDescriptor],
        root: &Path,
        cancel: &CancellationToken,
        on_batch: &(dyn Fn(RetrieveProgress) + Send + Sync),
    ) -> AppResult<RetrievedOutputs> {
        let targets: Vec<(&OutputDescriptor, PathBuf)> =
            descriptors.iter().map(|d| (d, d.target(root))).collect();

        let mut pending = missing(&targets).await;
        let mut batch = 0u32;

        while !pending.is_empty() {
            if cancel.is_cancelled() {
                info!(batch, missing = pending.len(), "Retrieval cancelled");
                return Err(TransferError::Cancelled.into());
            }
            if let Some(max) = self.max_batches {
                if batch >= max {
                    let missing = pending
                        .iter()
                        .map(|(d, _)| d.relative_path().to_string_lossy().replace('\\', "/"))
                        .collect();
                    return Err(TransferError::OutputsMissing {
                        batches: batch,
                        missing,
                    }
                    .into());
                }
            }

            batch += 1;
            self.metrics.record_batch();
            debug!(batch, files = pending.len(), "Starting download batch");
            self.download_batch(&pending).await;

            pending = missing(&targets).await;
            on_batch(RetrieveProgress {
                batch,
                present: targets.len() - pending.len(),
                total: targets.len(),
            });
            if !pending.is_empty() {
                warn!(batch, missing = pending.len(), "Outputs still missing after batch");
                if self.max_batches.is_none_or(|max| batch < max) {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        let final_output = targets.iter().find(|(d, _)| d.is_final_output);
        Ok(RetrievedOutputs {
            paths: targets.iter().map(|(_, p)| p.clone()).collect(),
            final_output_meta: final_output.and_then(|(d, _)| d.output_meta.clone()),
            final_output_path: final_output.map(|(_, p)| p.clone()),
            batches: batch,
        })
    }

    async fn download_batch(&self, pending: &[(&OutputDescriptor, PathBuf)]) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tasks = pending.iter().map(|(descriptor, target)| {
            let semaphore = semaphore.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                let temp = part_path(target);
                match self.blob.download(&descriptor.url, &temp).await {
                    Ok(bytes) => match tokio::fs::rename(&temp, target).await {
                        Ok(()) => {
                            self.metrics.record_download();
                            debug!(file = %target.display(), bytes, "Output downloaded");
                        }
                        Err(e) => {
                            self.metrics.record_download_failure();
                            warn!(file = %target.display(), error = %e, "Failed to move download into place");
                        }
                    },
                    Err(e) => {
                        self.metrics.record_download_failure();
                        let _ = tokio::fs::remove_file(&temp).await;
                        warn!(file = %target.display(), error = %e, "Output download failed");
                    }
                }
            }
        });
        join_all(tasks).await;
    }
}

/// Targets not present on disk as regular files.
async fn missing<'a>(
    targets: &[(&'a OutputDescriptor, PathBuf)],
) -> Vec<(&'a OutputDescriptor, PathBuf)> {
    let mut pending = Vec::new();
    for (descriptor, target) in targets {
        let present = tokio::fs::metadata(target)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !present {
            pending.push((*descriptor, target.clone()));
        }
    }
    pending
}

/// Temporary download path next to `target`.
fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::test_support::FakeBlob;

    fn descriptor(name: &str, group: &str, is_final: bool) -> OutputDescriptor {
        OutputDescriptor {
            url: format!("https://blob/out/{name}"),
            filename: name.to_string(),
            group: group.to_string(),
            is_final_output: is_final,
            output_meta: is_final.then(|| json!({"total_area": 12.5})),
        }
    }

    fn outputs(blob: &FakeBlob) -> Vec<OutputDescriptor> {
        let list = vec![
            descriptor("scenario.tif", "", true),
            descriptor("a.tif", "weighted_activities", false),
            descriptor("b.tif", "weighted_activities", false),
            descriptor("c.tif", "activities", false),
            descriptor("d.tif", "activities", false),
        ];
        for d in &list {
            blob.serve(&d.url, d.filename.as_bytes());
        }
        list
    }

    fn no_progress() -> impl Fn(RetrieveProgress) + Send + Sync {
        |_| {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_need_two_batches() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FakeBlob::default());
        let list = outputs(&blob);
        blob.fail_downloads(&list[1].url, 1);
        blob.fail_downloads(&list[3].url, 1);

        let retriever = OutputRetriever::new(blob.clone(), 3, None, Arc::new(TransferMetrics::new()));
        let batches = std::sync::Mutex::new(Vec::new());
        let on_batch = |p: RetrieveProgress| batches.lock().unwrap().push(p);
        let result = retriever
            .retrieve(&list, dir.path(), &CancellationToken::new(), &on_batch)
            .await
            .unwrap();

        assert_eq!(result.batches, 2);
        assert_eq!(result.paths.len(), 5);
        assert!(result.paths.iter().all(|p| p.is_file()));
        assert_eq!(blob.download_count(), 7);
        assert_eq!(result.final_output_meta, Some(json!({"total_area": 12.5})));
        assert_eq!(result.final_output_path, Some(dir.path().join("scenario.tif")));
        assert_eq!(
            result.paths[1],
            dir.path().join("weighted_activities").join("a.tif")
        );

        let batches = batches.lock().unwrap();
        assert_eq!(batches[0].present, 3);
        assert_eq!(batches[1].present, 5);
    }

    #[tokio::test]
    async fn test_present_files_are_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FakeBlob::default());
        let list = outputs(&blob);
        std::fs::write(dir.path().join("scenario.tif"), b"already here").unwrap();

        let retriever = OutputRetriever::new(blob.clone(), 3, None, Arc::new(TransferMetrics::new()));
        let result = retriever
            .retrieve(&list, dir.path(), &CancellationToken::new(), &no_progress())
            .await
            .unwrap();

        assert_eq!(result.batches, 1);
        assert_eq!(blob.download_count(), 4);
        assert_eq!(
            std::fs::read(dir.path().join("scenario.tif")).unwrap(),
            b"already here"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_ceiling_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FakeBlob::default());
        let list = outputs(&blob);
        blob.fail_downloads(&list[2].url, 10);

        let retriever = OutputRetriever::new(blob.clone(), 3, Some(2), Arc::new(TransferMetrics::new()));
        let err = retriever
            .retrieve(&list, dir.path(), &CancellationToken::new(), &no_progress())
            .await
            .unwrap_err();

        assert_eq!(err.kind, scenario_core::error::ErrorKind::PartialOutput);
        assert!(err.message.contains("weighted_activities/b.tif"));
        assert!(!dir.path().join("weighted_activities").join("b.tif.part").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_waits_between_batches_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FakeBlob::default());
        let list = outputs(&blob);
        blob.fail_downloads(&list[4].url, u32::MAX);
        let metrics = Arc::new(TransferMetrics::new());
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            token.cancel();
        });

        let retriever = OutputRetriever::new(blob.clone(), 3, None, metrics.clone())
            .with_retry_delay(Duration::from_secs(3600));
        let err = retriever
            .retrieve(&list, dir.path(), &cancel, &no_progress())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(metrics.snapshot().download_batches, 1);
        assert_eq!(blob.download_count(), 5);
    }

    #[tokio::test]
    async fn test_cancelled_before_batch() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FakeBlob::default());
        let list = outputs(&blob);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let retriever = OutputRetriever::new(blob.clone(), 3, None, Arc::new(TransferMetrics::new()));
        let err = retriever
            .retrieve(&list, dir.path(), &cancel, &no_progress())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(blob.download_count(), 0);
    }
}
