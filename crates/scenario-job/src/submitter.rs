//! Builds the submission payload and starts the remote job.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use scenario_cache::layer::normalize_path;
use scenario_client::api::RemoteApi;
use scenario_core::error::{AppError, ErrorKind};
use scenario_core::result::AppResult;
use scenario_core::types::id::{LayerId, RemoteJobId};
use scenario_entity::scenario::Scenario;
use scenario_entity::wire::{
    ActivityPayload, ExtentPayload, PathwayPayload, PriorityLayerPayload, ScenarioPayload,
};

/// Remote layer ids keyed by normalized local path.
pub type LayerMap = HashMap<String, LayerId>;

/// Submits scenarios and starts their execution.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    api: Arc<dyn RemoteApi>,
}

impl JobSubmitter {
    /// Create a submitter.
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// Submit the scenario, start it, and return the remote job id.
    ///
    /// Only a 201 counts as success for either call.
    #[instrument(skip_all, fields(scenario = %scenario.uuid))]
    pub async fn submit(&self, scenario: &Scenario, layers: &LayerMap) -> AppResult<RemoteJobId> {
        let payload = build_payload(scenario, layers)?;

        let job_id = match self.api.submit_scenario(&payload).await {
            Ok((201, response)) => response
                .uuid
                .ok_or_else(|| AppError::submission("Submission accepted without a job id"))?,
            Ok((status, response)) => {
                let detail = response.detail.map(|d| detail_text(&d)).unwrap_or_default();
                return Err(rejected(
                    ErrorKind::Submission,
                    format!("Scenario submission returned HTTP {status}: {detail}"),
                    status,
                ));
            }
            Err(e) => return Err(reclassify(e, ErrorKind::Submission)),
        };
        info!(job_id = %job_id, "Scenario submitted");

        match self.api.execute_scenario(job_id).await {
            Ok(201) => {}
            Ok(status) => {
                return Err(rejected(
                    ErrorKind::Execution,
                    format!("Scenario execution returned HTTP {status}"),
                    status,
                ));
            }
            Err(e) => return Err(reclassify(e, ErrorKind::Execution)),
        }
        info!(job_id = %job_id, "Scenario execution started");

        Ok(job_id)
    }
}

/// Top-level payload keys that analysis parameters may not use.
pub const RESERVED_PAYLOAD_KEYS: [&str; 5] = [
    "scenario_name",
    "scenario_desc",
    "extent",
    "activities",
    "priority_layer_groups",
];

/// Build the submission payload, replacing local paths with layer ids.
///
/// References whose path has no remote layer are left out. Parameters
/// named like a payload field are rejected.
pub fn build_payload(scenario: &Scenario, layers: &LayerMap) -> AppResult<ScenarioPayload> {
    if let Some(key) = RESERVED_PAYLOAD_KEYS
        .iter()
        .find(|key| scenario.parameters.contains_key(**key))
    {
        return Err(AppError::validation(format!(
            "Analysis parameter '{key}' collides with a submission field"
        )));
    }

    let lookup = |path: &Path| -> Option<LayerId> {
        if path.as_os_str().is_empty() {
            return None;
        }
        layers.get(&normalize_path(path)).copied()
    };

    let activities = scenario
        .activities
        .iter()
        .map(|activity| ActivityPayload {
            uuid: activity.uuid,
            name: activity.name.clone(),
            description: activity.description.clone(),
            pathways: activity
                .pathways
                .iter()
                .map(|pathway| PathwayPayload {
                    uuid: pathway.uuid,
                    name: pathway.name.clone(),
                    description: pathway.description.clone(),
                    layer_uuid: lookup(&pathway.path),
                    carbon_uuids: pathway.carbon_paths.iter().filter_map(|p| lookup(p)).collect(),
                })
                .collect(),
            priority_layers: activity
                .priority_layers
                .iter()
                .filter_map(|layer| {
                    lookup(&layer.path).map(|layer_uuid| PriorityLayerPayload {
                        uuid: layer.uuid,
                        name: layer.name.clone(),
                        layer_uuid,
                        groups: layer.groups.clone(),
                    })
                })
                .collect(),
            mask_uuids: activity.mask_paths.iter().filter_map(|p| lookup(p)).collect(),
        })
        .collect();

    let priority_layer_groups = match serde_json::to_value(&scenario.priority_layer_groups)? {
        Value::Array(groups) => groups,
        other => vec![other],
    };

    Ok(ScenarioPayload {
        scenario_name: scenario.name.clone(),
        scenario_desc: scenario.description.clone(),
        extent: ExtentPayload {
            bbox: scenario.extent.bbox,
            crs: scenario.extent.crs.clone(),
        },
        activities,
        priority_layer_groups,
        parameters: scenario.parameters.clone(),
    })
}

fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn rejected(kind: ErrorKind, message: String, status: u16) -> AppError {
    let mut err = AppError::new(kind, message);
    err.status = Some(status);
    err
}

/// HTTP rejections become `kind`; transport failures stay request errors.
fn reclassify(err: AppError, kind: ErrorKind) -> AppError {
    match (err.kind, err.status) {
        (ErrorKind::Request, Some(status)) => rejected(kind, err.message, status),
        _ => err,
    }
}
