//! Credentials and bearer token handling.

pub mod credentials;
pub mod token;

pub use credentials::StaticCredentials;
pub use token::TokenState;
