//! Collaborator traits defined in `scenario-core` and implemented by other
//! crates or by the host application.

pub mod credentials;
pub mod store;
pub mod task;

pub use credentials::{CredentialProvider, Credentials};
pub use store::KeyValueStore;
pub use task::{TaskHost, TaskOutcome};
