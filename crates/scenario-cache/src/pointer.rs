//! Pointer to the remote scenario currently being executed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scenario_core::result::AppResult;
use scenario_core::traits::store::KeyValueStore;
use scenario_core::types::id::{RemoteJobId, ScenarioId};

use crate::keys;

/// The submitted job a restarted application should reattach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningScenario {
    /// Local scenario identity.
    pub scenario_id: ScenarioId,
    /// Remote job identity.
    pub job_id: RemoteJobId,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// Reads and writes the running-scenario pointer.
#[derive(Debug, Clone)]
pub struct RunningScenarioStore {
    store: Arc<dyn KeyValueStore>,
}

impl RunningScenarioStore {
    /// Wrap a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current pointer, if any.
    pub async fn get(&self) -> AppResult<Option<RunningScenario>> {
        match self.store.get(&keys::running_scenario()).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Record a freshly submitted job.
    pub async fn set(&self, scenario_id: ScenarioId, job_id: RemoteJobId) -> AppResult<()> {
        let pointer = RunningScenario {
            scenario_id,
            job_id,
            submitted_at: Utc::now(),
        };
        let json = serde_json::to_string(&pointer)?;
        self.store.set(&keys::running_scenario(), &json).await
    }

    /// Clear the pointer.
    pub async fn clear(&self) -> AppResult<()> {
        self.store.delete(&keys::running_scenario()).await
    }
}
