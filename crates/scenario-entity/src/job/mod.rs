//! Remote job status and handle.

pub mod handle;
pub mod status;

pub use handle::{JobHandle, log_line};
pub use status::JobStatus;
