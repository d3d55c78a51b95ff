//! Remote service endpoint and authentication configuration.

use serde::{Deserialize, Serialize};

/// Remote compute service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the compute API (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// URL of the login exchange.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Seconds subtracted from a token's expiry before it is considered stale.
    #[serde(default = "default_token_skew")]
    pub token_skew_seconds: i64,
    /// Lifetime assumed for tokens whose expiry cannot be determined.
    #[serde(default = "default_token_fallback_lifetime")]
    pub token_fallback_lifetime_seconds: i64,
    /// Login user name (usually provided via `SCENARIO__API__USERNAME`).
    #[serde(default)]
    pub username: Option<String>,
    /// Login password (usually provided via `SCENARIO__API__PASSWORD`).
    #[serde(default)]
    pub password: Option<String>,
    /// Pre-issued bearer token, used instead of the login exchange.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_url: default_auth_url(),
            request_timeout_seconds: default_request_timeout(),
            token_skew_seconds: default_token_skew(),
            token_fallback_lifetime_seconds: default_token_fallback_lifetime(),
            username: None,
            password: None,
            token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_auth_url() -> String {
    "http://localhost:8000/auth".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_token_skew() -> i64 {
    30
}

fn default_token_fallback_lifetime() -> i64 {
    3600
}
