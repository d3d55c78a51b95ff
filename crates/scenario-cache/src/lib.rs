//! # scenario-cache
//!
//! Persistent key-value stores and the typed stores layered on them:
//!
//! - **memory**: process-local store backed by a `DashMap`
//! - **file**: a single JSON document on disk, rewritten atomically
//! - **layer**: upload checkpoints keyed by normalized local path
//! - **pointer**: the "currently running remote scenario" record

pub mod file;
pub mod keys;
pub mod layer;
pub mod memory;
pub mod pointer;

pub use file::JsonFileStore;
pub use layer::{LayerCacheStore, normalize_path};
pub use memory::MemoryStore;
pub use pointer::{RunningScenario, RunningScenarioStore};
