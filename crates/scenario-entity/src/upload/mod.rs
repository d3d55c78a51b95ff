//! Layer upload models: roles, persisted checkpoints, and per-file results.

pub mod record;
pub mod result;
pub mod role;

pub use record::{PartDescriptor, UploadRecord};
pub use result::UploadResult;
pub use role::LayerRole;
