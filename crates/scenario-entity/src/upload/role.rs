//! What a layer is used for in the scenario.

use serde::{Deserialize, Serialize};

/// Component type sent with the begin-upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    /// Main pathway raster.
    Pathway,
    /// Auxiliary carbon raster of a pathway.
    Carbon,
    /// Priority weighting layer.
    Priority,
    /// Mask layer.
    Mask,
    /// Study area extent.
    Extent,
}

impl LayerRole {
    /// Return the role as the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pathway => "pathway",
            Self::Carbon => "carbon",
            Self::Priority => "priority",
            Self::Mask => "mask",
            Self::Extent => "extent",
        }
    }
}

impl std::fmt::Display for LayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
