//! Scenario, activity, and pathway models.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scenario_core::types::id::{RemoteJobId, ScenarioId};

use crate::upload::LayerRole;

/// Bounding box of the analysis area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    /// `[xmin, xmax, ymin, ymax]` in `crs` units.
    pub bbox: [f64; 4],
    /// Coordinate reference system identifier, e.g. `EPSG:4326`.
    #[serde(default = "default_crs")]
    pub crs: String,
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

/// Weight assigned to a priority layer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityLayerGroup {
    /// Group name.
    pub name: String,
    /// Relative importance, 0 to 5.
    pub value: i32,
}

/// A weighting layer referenced by an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityLayer {
    /// Layer identity.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Local raster path.
    #[serde(default)]
    pub path: PathBuf,
    /// Names of the groups this layer belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A single spatial input layer feeding an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    /// Pathway identity.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Local path of the pathway layer.
    #[serde(default)]
    pub path: PathBuf,
    /// Auxiliary carbon layers.
    #[serde(default)]
    pub carbon_paths: Vec<PathBuf>,
}

impl Pathway {
    /// All local files the pathway references, main layer first.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.carbon_paths.iter().map(PathBuf::as_path))
    }
}

/// One candidate land-use option within a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity identity.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Output raster of the activity, set once results are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Input pathways.
    #[serde(default)]
    pub pathways: Vec<Pathway>,
    /// Weighting layers.
    #[serde(default)]
    pub priority_layers: Vec<PriorityLayer>,
    /// Optional mask layers.
    #[serde(default)]
    pub mask_paths: Vec<PathBuf>,
}

/// A named analysis request composed of activities and shared parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Local identity.
    #[serde(default)]
    pub uuid: ScenarioId,
    /// Identity assigned by the remote service on submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_uuid: Option<RemoteJobId>,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Analysis area.
    pub extent: SpatialExtent,
    /// Ordered activities.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Priority layer group weights.
    #[serde(default)]
    pub priority_layer_groups: Vec<PriorityLayerGroup>,
    /// Free-form analysis parameters forwarded to the remote service.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl Scenario {
    /// Every local file the scenario references, with the role it plays.
    ///
    /// A file used in several roles keeps the first one met in walk order.
    pub fn layer_roles(&self) -> BTreeMap<PathBuf, LayerRole> {
        let mut roles = BTreeMap::new();
        let mut add = |path: &Path, role: LayerRole| {
            if !path.as_os_str().is_empty() {
                roles.entry(path.to_path_buf()).or_insert(role);
            }
        };
        for activity in &self.activities {
            for pathway in &activity.pathways {
                for (i, file) in pathway.files().enumerate() {
                    add(file, if i == 0 { LayerRole::Pathway } else { LayerRole::Carbon });
                }
            }
            for layer in &activity.priority_layers {
                add(&layer.path, LayerRole::Priority);
            }
            for mask in &activity.mask_paths {
                add(mask, LayerRole::Mask);
            }
        }
        roles
    }
}
