//! JSON-file-backed key-value store.

pub mod store;

pub use store::JsonFileStore;
