//! Per-file upload outcome.

use scenario_core::error::AppError;
use scenario_core::types::id::LayerId;

/// Outcome of making one local file available remotely.
#[derive(Debug, Clone)]
pub enum UploadResult {
    /// The remote already had the layer.
    Cached {
        /// Existing remote layer.
        layer_id: LayerId,
    },
    /// The layer was uploaded in this run.
    Uploaded {
        /// Newly created remote layer.
        layer_id: LayerId,
    },
    /// The upload failed.
    Failed {
        /// Cause of the failure.
        error: AppError,
    },
    /// Cancellation was observed before the upload finished.
    Cancelled,
}

impl UploadResult {
    /// Remote layer the file is available as, if any.
    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            Self::Cached { layer_id } | Self::Uploaded { layer_id } => Some(*layer_id),
            Self::Failed { .. } | Self::Cancelled => None,
        }
    }

    /// Whether the file is available remotely.
    pub fn is_available(&self) -> bool {
        self.layer_id().is_some()
    }
}
