//! Presigned blob transfer: part uploads and output downloads.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ETAG;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use scenario_core::error::{AppError, ErrorKind};
use scenario_core::result::AppResult;

/// Outcome of a part PUT that reached the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResponse {
    /// HTTP status code.
    pub status: u16,
    /// `ETag` header exactly as sent, quotes included.
    pub etag: Option<String>,
}

/// Transfers raw bytes to and from presigned URLs.
///
/// Presigned URLs carry their own authorization; no bearer token is sent.
#[async_trait]
pub trait BlobTransport: Send + Sync + std::fmt::Debug + 'static {
    /// PUT one part. Transport failures are errors; any HTTP status is returned.
    async fn put_part(&self, url: &str, body: Bytes) -> AppResult<PartResponse>;

    /// GET `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64>;
}

/// [`BlobTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBlobTransport {
    client: Client,
}

impl HttpBlobTransport {
    /// Create the transport.
    ///
    /// Only the connection phase is bounded by `connect_timeout_seconds`;
    /// large bodies may take arbitrarily long.
    pub fn new(connect_timeout_seconds: u64) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_seconds))
            .build()
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to build blob client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobTransport for HttpBlobTransport {
    async fn put_part(&self, url: &str, body: Bytes) -> AppResult<PartResponse> {
        let size = body.len();
        let response = self
            .client
            .put(url)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Request, format!("Part upload failed: {e}"), e))?;

        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(size, status, etag = ?etag, "Part PUT finished");
        Ok(PartResponse { status, etag })
    }

    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Request, format!("Download failed: {e}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::http("download output", status.as_u16(), &body));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::with_source(ErrorKind::Request, format!("Download interrupted: {e}"), e)
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(dest = %dest.display(), bytes = written, "Download finished");
        Ok(written)
    }
}
