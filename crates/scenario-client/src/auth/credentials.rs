//! Credentials taken from configuration.

use async_trait::async_trait;

use scenario_core::config::api::ApiConfig;
use scenario_core::error::AppError;
use scenario_core::result::AppResult;
use scenario_core::traits::credentials::{CredentialProvider, Credentials};

/// Fixed credentials resolved once at startup.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Option<Credentials>,
}

impl StaticCredentials {
    /// Use the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// Build from the `api` configuration section.
    ///
    /// A configured token wins over a username/password pair.
    pub fn from_config(config: &ApiConfig) -> Self {
        let credentials = match (&config.token, &config.username, &config.password) {
            (Some(token), _, _) if !token.is_empty() => Some(Credentials::Token {
                token: token.clone(),
            }),
            (_, Some(username), Some(password)) => Some(Credentials::Password {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> AppResult<Credentials> {
        self.credentials
            .clone()
            .ok_or_else(|| AppError::authentication("No credentials configured for the compute service"))
    }
}
