//! Retrying upload of a single part to a presigned URL.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use scenario_client::blob::BlobTransport;
use scenario_core::config::transfer::TransferConfig;
use scenario_entity::upload::PartDescriptor;

use crate::error::TransferError;
use crate::metrics::TransferMetrics;

/// Uploads one part with bounded exponential backoff.
///
/// A transport error, a non-2xx status, or a 2xx without an `ETag` is a
/// failed attempt. After failed attempt `k` (0-based) the uploader waits
/// `backoff_base * 2^k` before trying again, up to `max_retries` retries.
#[derive(Debug, Clone)]
pub struct ChunkUploader {
    blob: Arc<dyn BlobTransport>,
    max_retries: u32,
    backoff_base: Duration,
    metrics: Arc<TransferMetrics>,
}

impl ChunkUploader {
    /// Create an uploader.
    pub fn new(
        blob: Arc<dyn BlobTransport>,
        max_retries: u32,
        backoff_base: Duration,
        metrics: Arc<TransferMetrics>,
    ) -> Self {
        Self {
            blob,
            max_retries,
            backoff_base,
            metrics,
        }
    }

    /// Create an uploader from the `transfer` configuration section.
    pub fn from_config(
        blob: Arc<dyn BlobTransport>,
        config: &TransferConfig,
        metrics: Arc<TransferMetrics>,
    ) -> Self {
        Self::new(
            blob,
            config.max_part_retries,
            Duration::from_millis(config.backoff_base_millis),
            metrics,
        )
    }

    /// Upload `body` as part `part_number` and return its descriptor.
    pub async fn upload_part(
        &self,
        url: &str,
        body: Bytes,
        part_number: u32,
    ) -> Result<PartDescriptor, TransferError> {
        let size = body.len() as u64;
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt - 1);
                debug!(part_number, attempt, delay_ms = delay.as_millis() as u64, "Retrying part upload");
                tokio::time::sleep(delay).await;
            }

            let outcome = match self.blob.put_part(url, body.clone()).await {
                Ok(response) if (200..300).contains(&response.status) => match response.etag {
                    Some(etag) => Ok(etag),
                    None => Err(TransferError::MissingEtag { part_number }.to_string()),
                },
                Ok(response) => Err(TransferError::PartRejected {
                    part_number,
                    status: response.status,
                }
                .to_string()),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(etag) => {
                    self.metrics.record_part(size);
                    return Ok(PartDescriptor { part_number, etag });
                }
                Err(e) => {
                    self.metrics.record_part_failure();
                    warn!(part_number, attempt, error = %e, "Part upload attempt failed");
                    last_error = e;
                }
            }
        }

        Err(TransferError::RetriesExhausted {
            part_number,
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    fn backoff(&self, failed_attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << failed_attempt.min(16))
    }
}
