//! Output listing bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `GET /scenario_output/{uuid}/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Download URL.
    pub url: String,
    /// File name.
    pub filename: String,
    /// Output group.
    #[serde(default)]
    pub group: Option<String>,
    /// Whether this is the final analysis output.
    #[serde(default)]
    pub is_final_output: bool,
    /// Metadata of the final output.
    #[serde(default)]
    pub output_meta: Option<Value>,
}

/// Response of the output listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputListResponse {
    /// Declared outputs.
    #[serde(default)]
    pub results: Vec<OutputEntry>,
}
