//! # scenario-entity
//!
//! Domain models for remote scenario execution: scenarios and their
//! activities, job handles and statuses, upload checkpoints, output
//! descriptors, and the JSON shapes exchanged with the compute service.

pub mod job;
pub mod output;
pub mod scenario;
pub mod upload;
pub mod wire;
