//! Result of a completed remote scenario run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Scenario;

/// The locally reconstructed outcome of a remote run.
///
/// Only built once every declared output file is present on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario with activity and pathway paths pointing at downloaded files.
    pub scenario: Scenario,
    /// Root directory the outputs were downloaded into.
    pub scenario_directory: PathBuf,
    /// Metadata attached to the final analysis output.
    pub final_output_meta: Option<serde_json::Value>,
    /// Local path of the final analysis output.
    pub final_output_path: Option<PathBuf>,
    /// When the result was assembled.
    pub created_at: DateTime<Utc>,
}
