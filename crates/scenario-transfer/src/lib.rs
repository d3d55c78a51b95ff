//! # scenario-transfer
//!
//! Moves bytes between the local machine and the compute service:
//!
//! - [`chunked`]: part planning and the retrying part uploader
//! - [`coordinator::LayerUploadCoordinator`]: uploads only the layers the
//!   service is missing, resuming from persisted checkpoints
//! - [`retriever::OutputRetriever`]: downloads declared outputs in verified
//!   batches until every file is on disk

pub mod chunked;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunked::{ChunkPlan, ChunkUploader};
pub use coordinator::{LayerUploadCoordinator, UploadProgress};
pub use error::TransferError;
pub use metrics::TransferMetrics;
pub use retriever::{OutputRetriever, RetrieveProgress, RetrievedOutputs};
