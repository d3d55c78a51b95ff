//! Events emitted while a remote scenario job runs.
//!
//! Events are published on a broadcast channel owned by the orchestrator
//! and consumed by whatever surrounds it (a progress view, a log sink).

pub mod job;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use job::{JobEvent, JobPhase};

/// Wrapper for all job events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Local scenario the event belongs to.
    pub scenario_id: Uuid,
    /// The event payload.
    pub event: JobEvent,
}

impl EventEnvelope {
    /// Wrap an event for the given scenario.
    pub fn new(scenario_id: Uuid, event: JobEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            scenario_id,
            event,
        }
    }
}
