//! # scenario-job
//!
//! Drives one scenario through remote execution: upload missing layers,
//! submit and execute, poll to a terminal status, download outputs, and
//! rebuild the local result.

pub mod assembler;
pub mod host;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod submitter;

pub use assembler::ResultAssembler;
pub use host::TracingTaskHost;
pub use orchestrator::{Job, JobServices};
pub use poller::StatusPoller;
pub use submitter::JobSubmitter;
