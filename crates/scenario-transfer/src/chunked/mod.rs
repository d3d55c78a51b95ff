//! Chunked multipart upload primitives.

pub mod plan;
pub mod uploader;

pub use plan::ChunkPlan;
pub use uploader::ChunkUploader;
