//! Layer upload bodies.

use serde::{Deserialize, Serialize};

use scenario_core::types::id::LayerId;

use crate::upload::{LayerRole, PartDescriptor};

/// `POST /layer/upload/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartUploadRequest {
    /// Layer type, always `0` for rasters uploaded by this client.
    pub layer_type: u8,
    /// Role of the layer in the scenario.
    pub component_type: LayerRole,
    /// Original file name.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Number of presigned URLs to issue.
    pub number_of_parts: u32,
    /// Layers uploaded by a client are private.
    pub privacy_type: String,
}

/// Presigned URL for one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUrl {
    /// Presigned PUT URL.
    pub url: String,
    /// 1-based part number.
    pub part_number: u32,
}

/// Response to a begin-upload call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartUploadResponse {
    /// Remote layer identifier.
    pub uuid: LayerId,
    /// Multipart upload identifier.
    pub multipart_upload_id: String,
    /// Presigned URLs, one per part.
    #[serde(default)]
    pub upload_urls: Vec<UploadUrl>,
}

impl StartUploadResponse {
    /// URL for a part, regardless of the order the server listed them in.
    pub fn url_for(&self, part_number: u32) -> Option<&str> {
        self.upload_urls
            .iter()
            .find(|u| u.part_number == part_number)
            .map(|u| u.url.as_str())
    }
}

/// `POST /layer/upload/{uuid}/finish`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishUploadRequest {
    /// Multipart upload identifier.
    pub multipart_upload_id: String,
    /// Uploaded parts in part order.
    pub items: Vec<PartDescriptor>,
}

/// Response to a finish call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishUploadResponse {
    /// Remote layer identifier.
    pub uuid: LayerId,
    /// Server-side layer status.
    #[serde(default)]
    pub status: Option<String>,
}

/// `POST /layer/upload/{uuid}/abort`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortUploadRequest {
    /// Multipart upload identifier.
    pub multipart_upload_id: String,
}

/// Response to `POST /layer/check`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckLayersResponse {
    /// Layers the server does not have.
    #[serde(default)]
    pub unavailable: Vec<String>,
    /// Layers the server has but cannot use.
    #[serde(default)]
    pub invalid: Vec<String>,
}

impl CheckLayersResponse {
    /// Whether the layer was reported unavailable or invalid.
    pub fn needs_upload(&self, layer_id: &LayerId) -> bool {
        let id = layer_id.to_string();
        self.unavailable
            .iter()
            .chain(self.invalid.iter())
            .any(|s| s.eq_ignore_ascii_case(&id))
    }
}
