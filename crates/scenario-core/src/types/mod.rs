//! Shared value types: typed identifiers and worker pool sizing.

pub mod id;
pub mod pool;

pub use id::{LayerId, RemoteJobId, ScenarioId};
pub use pool::{default_worker_pool_size, worker_pool_size};
