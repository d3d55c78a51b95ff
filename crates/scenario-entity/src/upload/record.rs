//! Persisted upload checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scenario_core::types::id::LayerId;

use super::role::LayerRole;

/// One uploaded part, as required by the finish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDescriptor {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag returned by the blob store, quotes preserved.
    pub etag: String,
}

/// Checkpoint for one local file.
///
/// A record with `upload_id` set belongs to an upload that is active or
/// was interrupted. Once the remote acknowledges completion the
/// `upload_id` is cleared and the record only maps the path to its
/// remote layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Normalized local path.
    pub path: String,
    /// Role the layer was uploaded for.
    pub role: LayerRole,
    /// Remote layer identifier.
    #[serde(default)]
    pub layer_id: Option<LayerId>,
    /// In-flight multipart upload identifier.
    #[serde(default)]
    pub upload_id: Option<String>,
    /// Declared file size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Completed parts in part order.
    #[serde(default)]
    pub parts: Vec<PartDescriptor>,
    /// Last modification time of the record.
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Record a freshly started upload.
    pub fn started(
        path: impl Into<String>,
        role: LayerRole,
        layer_id: LayerId,
        upload_id: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            role,
            layer_id: Some(layer_id),
            upload_id: Some(upload_id.into()),
            size,
            parts: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether an upload for this record was started and never finished.
    pub fn is_in_flight(&self) -> bool {
        self.upload_id.is_some()
    }

    /// Append a completed part.
    pub fn push_part(&mut self, part: PartDescriptor) {
        self.parts.push(part);
        self.updated_at = Utc::now();
    }

    /// Mark the upload as acknowledged by the remote.
    pub fn complete(&mut self) {
        self.upload_id = None;
        self.parts.clear();
        self.updated_at = Utc::now();
    }
}
