//! Transfer-specific failures.
//!
//! Mapped into [`AppError`] at the crate boundary.

use std::path::PathBuf;

use thiserror::Error;

use scenario_core::error::{AppError, ErrorKind};

/// Failures raised while moving layer or output bytes.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The blob store answered a part PUT with a non-2xx status.
    #[error("Part {part_number} rejected with HTTP {status}")]
    PartRejected {
        /// Part number.
        part_number: u32,
        /// HTTP status.
        status: u16,
    },

    /// A 2xx part PUT came back without an `ETag` header.
    #[error("Part {part_number} response has no ETag")]
    MissingEtag {
        /// Part number.
        part_number: u32,
    },

    /// The begin-upload response listed no URL for a part.
    #[error("No presigned URL for part {part_number}")]
    MissingPartUrl {
        /// Part number.
        part_number: u32,
    },

    /// A local layer file does not exist or is not a regular file.
    #[error("Layer file not found: {path}")]
    FileNotFound {
        /// Local path.
        path: PathBuf,
    },

    /// The file has more parts than the remote protocol can number.
    #[error("File of {size} bytes needs too many parts at chunk size {chunk_size}")]
    TooManyParts {
        /// File size in bytes.
        size: u64,
        /// Chunk size in bytes.
        chunk_size: u64,
    },

    /// Chunk size must be positive.
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    /// The part retry budget was exhausted.
    #[error("Part {part_number} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Part number.
        part_number: u32,
        /// Attempts made.
        attempts: u32,
        /// Message of the last failure.
        last_error: String,
    },

    /// Outputs were still missing after the batch ceiling.
    #[error("{} output file(s) still missing after {batches} download batches: {}", .missing.len(), .missing.join(", "))]
    OutputsMissing {
        /// Batches attempted.
        batches: u32,
        /// Relative paths still missing.
        missing: Vec<String>,
    },

    /// Cancellation was observed.
    #[error("Transfer cancelled")]
    Cancelled,
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match &err {
            TransferError::Cancelled => AppError::cancelled(err.to_string()),
            TransferError::OutputsMissing { .. } => AppError::partial_output(err.to_string()),
            TransferError::ZeroChunkSize | TransferError::TooManyParts { .. } => {
                AppError::new(ErrorKind::Validation, err.to_string())
            }
            _ => AppError::upload(err.to_string()),
        }
    }
}
