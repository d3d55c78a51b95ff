//! Chunked upload and output download configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default part size for multipart layer uploads (100 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// Transfer settings shared by the upload coordinator and output retriever.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferConfig {
    /// Size of each uploaded part in bytes.
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size_bytes: u64,
    /// Retries per part after the first attempt.
    #[serde(default = "default_max_part_retries")]
    #[validate(range(max = 10))]
    pub max_part_retries: u32,
    /// Base delay for exponential backoff, in milliseconds (`base * 2^attempt`).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_millis: u64,
    /// Upper bound on concurrent file transfers.
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 16))]
    pub max_concurrency: usize,
    /// Optional ceiling on output download batches; `None` loops until cancelled.
    #[serde(default)]
    pub max_download_batches: Option<u32>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            max_part_retries: default_max_part_retries(),
            backoff_base_millis: default_backoff_base(),
            max_concurrency: default_max_concurrency(),
            max_download_batches: None,
        }
    }
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_part_retries() -> u32 {
    5
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_max_concurrency() -> usize {
    3
}
