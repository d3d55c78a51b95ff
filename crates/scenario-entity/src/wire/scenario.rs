//! Scenario submission and status bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use scenario_core::types::id::{LayerId, RemoteJobId};

/// Study area as sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentPayload {
    /// `[xmin, xmax, ymin, ymax]`.
    pub bbox: [f64; 4],
    /// Coordinate reference system.
    pub crs: String,
}

/// Pathway reference with local paths replaced by layer ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayPayload {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_uuid: Option<LayerId>,
    pub carbon_uuids: Vec<LayerId>,
}

/// Priority layer reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityLayerPayload {
    pub uuid: Uuid,
    pub name: String,
    pub layer_uuid: LayerId,
    pub groups: Vec<String>,
}

/// Activity reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub pathways: Vec<PathwayPayload>,
    pub priority_layers: Vec<PriorityLayerPayload>,
    pub mask_uuids: Vec<LayerId>,
}

/// `POST /scenario/submit`
///
/// Free-form analysis parameters are flattened into the top-level object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPayload {
    pub scenario_name: String,
    pub scenario_desc: String,
    pub extent: ExtentPayload,
    pub activities: Vec<ActivityPayload>,
    pub priority_layer_groups: Vec<Value>,
    #[serde(flatten)]
    pub parameters: serde_json::Map<String, Value>,
}

/// Response to a submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Remote job identifier, present on 201.
    #[serde(default)]
    pub uuid: Option<RemoteJobId>,
    /// Server explanation, present on rejection.
    #[serde(default)]
    pub detail: Option<Value>,
}

/// `GET /scenario/{uuid}/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Status string as the server reports it.
    #[serde(default)]
    pub status: String,
    /// Progress percentage.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Log entries accumulated so far.
    #[serde(default)]
    pub logs: Option<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_are_flattened() {
        let mut parameters = serde_json::Map::new();
        parameters.insert("snapping_enabled".into(), json!(true));
        let payload = ScenarioPayload {
            scenario_name: "S".into(),
            scenario_desc: String::new(),
            extent: ExtentPayload {
                bbox: [0.0, 1.0, 0.0, 1.0],
                crs: "EPSG:4326".into(),
            },
            activities: vec![],
            priority_layer_groups: vec![],
            parameters,
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["snapping_enabled"], json!(true));
        assert_eq!(value["extent"]["crs"], "EPSG:4326");
    }

    #[test]
    fn test_status_payload_tolerates_missing_fields() {
        let status: StatusPayload =
            serde_json::from_value(json!({"status": "Running"})).expect("deserialize");
        assert_eq!(status.progress, None);
        assert!(status.logs.is_none());
    }
}
