//! Credential provider trait for the login exchange.

use async_trait::async_trait;

use crate::result::AppResult;

/// Credentials handed to the transport when it needs a fresh token.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Account credentials exchanged for a token at the auth endpoint.
    Password {
        /// Account e-mail or user name.
        username: String,
        /// Account password.
        password: String,
    },
    /// An already-issued bearer token.
    Token {
        /// The raw bearer token.
        token: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
        }
    }
}

/// Source of credentials for the login exchange.
#[async_trait]
pub trait CredentialProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the current credentials.
    async fn credentials(&self) -> AppResult<Credentials>;
}
