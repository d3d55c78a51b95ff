//! Transfer counters.
//!
//! Thread-safe via atomics; shared by every worker of one run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for uploads and downloads.
#[derive(Debug, Default)]
pub struct TransferMetrics {
    /// Parts acknowledged by the blob store.
    pub parts_uploaded: AtomicU64,
    /// Part attempts that failed and were retried or given up.
    pub part_failures: AtomicU64,
    /// Bytes of acknowledged parts.
    pub bytes_uploaded: AtomicU64,
    /// Layers finished in this run.
    pub layers_uploaded: AtomicU64,
    /// Layers the service already had.
    pub layers_cached: AtomicU64,
    /// Output files downloaded.
    pub files_downloaded: AtomicU64,
    /// Output downloads that failed.
    pub download_failures: AtomicU64,
    /// Download batches run.
    pub download_batches: AtomicU64,
}

/// Point-in-time copy of [`TransferMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferSnapshot {
    pub parts_uploaded: u64,
    pub part_failures: u64,
    pub bytes_uploaded: u64,
    pub layers_uploaded: u64,
    pub layers_cached: u64,
    pub files_downloaded: u64,
    pub download_failures: u64,
    pub download_batches: u64,
}

impl TransferMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acknowledged part.
    pub fn record_part(&self, bytes: u64) {
        self.parts_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed part attempt.
    pub fn record_part_failure(&self) {
        self.part_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished layer upload.
    pub fn record_layer_uploaded(&self) {
        self.layers_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a layer reused from the service.
    pub fn record_layer_cached(&self) {
        self.layers_cached.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a downloaded file.
    pub fn record_download(&self) {
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed download.
    pub fn record_download_failure(&self) {
        self.download_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a download batch.
    pub fn record_batch(&self) {
        self.download_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            parts_uploaded: self.parts_uploaded.load(Ordering::Relaxed),
            part_failures: self.part_failures.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            layers_uploaded: self.layers_uploaded.load(Ordering::Relaxed),
            layers_cached: self.layers_cached.load(Ordering::Relaxed),
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            download_batches: self.download_batches.load(Ordering::Relaxed),
        }
    }
}
