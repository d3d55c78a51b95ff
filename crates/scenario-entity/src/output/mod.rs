//! Declared output artifacts of a remote run.

pub mod descriptor;

pub use descriptor::OutputDescriptor;
