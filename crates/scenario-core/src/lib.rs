//! # scenario-core
//!
//! Core crate for remote scenario execution. Contains the collaborator
//! traits (key-value store, credentials, task host), configuration
//! schemas, typed identifiers, job events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
