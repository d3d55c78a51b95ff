//! Scenario domain entities.

pub mod model;
pub mod result;

pub use model::{Activity, Pathway, PriorityLayer, PriorityLayerGroup, Scenario, SpatialExtent};
pub use result::ScenarioResult;
