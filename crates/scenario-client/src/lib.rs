//! # scenario-client
//!
//! Client side of the remote compute service:
//!
//! - [`transport::HttpTransport`]: JSON requests with bearer-token refresh
//! - [`api::RemoteApi`]: one typed method per endpoint
//! - [`blob::BlobTransport`]: presigned PUT of upload parts and GET of outputs

pub mod api;
pub mod auth;
pub mod blob;
pub mod endpoints;
pub mod transport;

pub use api::{HttpRemoteApi, RemoteApi};
pub use auth::credentials::StaticCredentials;
pub use blob::{BlobTransport, HttpBlobTransport, PartResponse};
pub use transport::HttpTransport;
