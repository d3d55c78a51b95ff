//! Output descriptor and its local placement.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::output::OutputEntry;

/// One file the remote run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Download URL.
    pub url: String,
    /// File name as produced remotely.
    pub filename: String,
    /// Output group, used as the subfolder name.
    pub group: String,
    /// Whether this is the final analysis output.
    pub is_final_output: bool,
    /// Metadata of the final output.
    pub output_meta: Option<Value>,
}

impl OutputDescriptor {
    /// Path relative to the scenario root.
    ///
    /// The final output lives at the root; everything else under its group.
    pub fn relative_path(&self) -> PathBuf {
        let filename = sanitize(&self.filename);
        if self.is_final_output || self.group.trim().is_empty() {
            PathBuf::from(filename)
        } else {
            Path::new(&sanitize(&self.group)).join(filename)
        }
    }

    /// Absolute target under `root`.
    pub fn target(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

impl From<OutputEntry> for OutputDescriptor {
    fn from(entry: OutputEntry) -> Self {
        Self {
            url: entry.url,
            filename: entry.filename,
            group: entry.group.unwrap_or_default(),
            is_final_output: entry.is_final_output,
            output_meta: entry.output_meta,
        }
    }
}

/// Keep only the last path component so a server name cannot escape the root.
fn sanitize(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match last {
        "" | "." | ".." => "_".to_string(),
        other => other.to_string(),
    }
}
