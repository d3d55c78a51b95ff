//! Rebuilds the local scenario and its result from the remote detail
//! document and the downloaded files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_core::types::id::RemoteJobId;
use scenario_entity::scenario::{Activity, Scenario, ScenarioResult};
use scenario_transfer::retriever::RetrievedOutputs;

/// Turns remote metadata plus local files into a [`ScenarioResult`].
#[derive(Debug, Clone, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    /// Create an assembler.
    pub fn new() -> Self {
        Self
    }

    /// Assemble the result.
    ///
    /// Every remote path in the detail is replaced by the downloaded file
    /// with the same file name. Pathways and carbon layers without a local
    /// match are dropped, as are activities whose own output is missing.
    /// Priority layers and masks keep their original local references.
    pub fn assemble(
        &self,
        original: &Scenario,
        job_id: RemoteJobId,
        detail: &Value,
        outputs: &RetrievedOutputs,
        root: &Path,
    ) -> AppResult<(Scenario, ScenarioResult)> {
        let activities = detail
            .get("activities")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::assembly("Scenario detail has no activities array"))?;

        let index = filename_index(&outputs.paths);
        let mut rebuilt = Vec::with_capacity(activities.len());

        for raw in activities {
            let Some(obj) = raw.as_object() else {
                return Err(AppError::assembly("Scenario detail activity is not an object"));
            };
            if let Some(activity) = self.rebuild_activity(original, obj, &index)? {
                rebuilt.push(activity);
            }
        }

        let scenario = Scenario {
            uuid: original.uuid,
            server_uuid: Some(job_id),
            name: original.name.clone(),
            description: original.description.clone(),
            extent: original.extent.clone(),
            activities: rebuilt,
            priority_layer_groups: original.priority_layer_groups.clone(),
            parameters: original.parameters.clone(),
        };

        let result = ScenarioResult {
            scenario: scenario.clone(),
            scenario_directory: root.to_path_buf(),
            final_output_meta: outputs.final_output_meta.clone(),
            final_output_path: outputs.final_output_path.clone(),
            created_at: Utc::now(),
        };
        Ok((scenario, result))
    }

    fn rebuild_activity(
        &self,
        original: &Scenario,
        obj: &Map<String, Value>,
        index: &HashMap<String, PathBuf>,
    ) -> AppResult<Option<Activity>> {
        let mut obj = obj.clone();

        let own_path = match obj.get("path").and_then(Value::as_str).filter(|p| !p.is_empty()) {
            Some(remote) => match resolve(index, remote) {
                Some(local) => Some(local),
                None => {
                    warn!(activity = ?obj.get("name"), path = remote, "Activity output not downloaded, dropping activity");
                    return Ok(None);
                }
            },
            None => None,
        };
        obj.insert(
            "path".into(),
            own_path
                .as_ref()
                .map(|p| Value::String(p.to_string_lossy().into_owned()))
                .unwrap_or(Value::Null),
        );

        let pathways: Vec<Value> = obj
            .get("pathways")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|p| rebuild_pathway(p, index)).collect())
            .unwrap_or_default();
        if pathways.is_empty() && own_path.is_none() {
            debug!(activity = ?obj.get("name"), "Activity has no local files, dropping");
            return Ok(None);
        }
        obj.insert("pathways".into(), Value::Array(pathways));
        obj.remove("priority_layers");
        obj.remove("mask_paths");

        let mut activity: Activity = serde_json::from_value(Value::Object(obj))
            .map_err(|e| AppError::assembly(format!("Invalid activity in scenario detail: {e}")))?;

        if let Some(local) = original.activities.iter().find(|a| a.uuid == activity.uuid) {
            activity.priority_layers = local.priority_layers.clone();
            activity.mask_paths = local.mask_paths.clone();
        }
        Ok(Some(activity))
    }
}

fn rebuild_pathway(raw: &Value, index: &HashMap<String, PathBuf>) -> Option<Value> {
    let mut obj = raw.as_object()?.clone();
    obj.remove("layer_uuid");
    obj.remove("carbon_uuids");

    let remote = obj.get("path").and_then(Value::as_str)?;
    let local = resolve(index, remote)?;
    obj.insert("path".into(), Value::String(local.to_string_lossy().into_owned()));

    let carbon: Vec<Value> = obj
        .get("carbon_paths")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .filter_map(|p| resolve(index, p))
                .map(|p| Value::String(p.to_string_lossy().into_owned()))
                .collect()
        })
        .unwrap_or_default();
    obj.insert("carbon_paths".into(), Value::Array(carbon));

    Some(Value::Object(obj))
}

/// Map file name to downloaded path. A later file with the same name wins.
fn filename_index(paths: &[PathBuf]) -> HashMap<String, PathBuf> {
    paths
        .iter()
        .filter_map(|p| {
            p.file_name()
                .map(|n| (n.to_string_lossy().into_owned(), p.clone()))
        })
        .collect()
}

fn resolve(index: &HashMap<String, PathBuf>, remote: &str) -> Option<PathBuf> {
    let name = remote.rsplit(['/', '\\']).next()?;
    index.get(name).cloned()
}
