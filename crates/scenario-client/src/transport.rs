//! Authenticated JSON transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use scenario_core::config::api::ApiConfig;
use scenario_core::error::{AppError, ErrorKind};
use scenario_core::result::AppResult;
use scenario_core::traits::credentials::{CredentialProvider, Credentials};

use crate::auth::token::TokenState;

/// JSON-over-HTTPS transport with transparent bearer token refresh.
///
/// Requests never retry except once after a 401, following a token refresh.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    auth_url: String,
    token_skew_seconds: i64,
    token_fallback_seconds: i64,
    credentials: Arc<dyn CredentialProvider>,
    token: Arc<Mutex<Option<TokenState>>>,
}

impl HttpTransport {
    /// Build a transport from configuration.
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialProvider>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            token_skew_seconds: config.token_skew_seconds,
            token_fallback_seconds: config.token_fallback_lifetime_seconds,
            credentials,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Send a JSON request and return the decoded body and status code.
    ///
    /// Non-2xx responses fail with a request error carrying the status
    /// and body. Empty bodies decode to `null`.
    #[instrument(skip(self, body))]
    pub async fn request(
        &self,
        name: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> AppResult<(Value, u16)> {
        let token = self.bearer_token().await?;
        let (status, text) = self.send(&method, url, body, &token).await?;

        let (status, text) = if status == StatusCode::UNAUTHORIZED {
            info!(name, "Token rejected, refreshing");
            self.invalidate_token().await;
            let token = self.bearer_token().await?;
            self.send(&method, url, body, &token).await?
        } else {
            (status, text)
        };

        debug!(name, status = status.as_u16(), body = %text, "Remote response");

        if !status.is_success() {
            return Err(AppError::http(name, status.as_u16(), &text));
        }
        Ok((decode_body(&text), status.as_u16()))
    }

    /// Drop the cached token so the next request logs in again.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> AppResult<(StatusCode, String)> {
        let mut request = self.client.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::Request, format!("{method} {url} failed: {e}"), e)
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::with_source(ErrorKind::Request, format!("Failed to read response from {url}"), e)
        })?;
        Ok((status, text))
    }

    async fn bearer_token(&self) -> AppResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(state) = guard.as_ref() {
            if state.is_valid_at(Utc::now()) {
                return Ok(state.token.clone());
            }
        }

        let state = match self.credentials.credentials().await? {
            Credentials::Token { token } => TokenState::new(
                token,
                None,
                self.token_skew_seconds,
                self.token_fallback_seconds,
                Utc::now(),
            ),
            Credentials::Password { username, password } => self.login(&username, &password).await?,
        };
        let token = state.token.clone();
        *guard = Some(state);
        Ok(token)
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<TokenState> {
        debug!(username, "Logging in to compute service");
        let response = self
            .client
            .post(&self.auth_url)
            .json(&json!({ "email": username, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Authentication, format!("Login request failed: {e}"), e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::with_source(ErrorKind::Authentication, "Failed to read login response", e)
        })?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Login rejected");
            let mut err = AppError::authentication(format!(
                "Login failed with HTTP {}: {text}",
                status.as_u16()
            ));
            err.status = Some(status.as_u16());
            return Err(err);
        }

        let body = decode_body(&text);
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::authentication("Login response has no access_token"))?
            .to_string();
        let expires_in = body.get("expires_in").and_then(Value::as_i64);

        Ok(TokenState::new(
            token,
            expires_in,
            self.token_skew_seconds,
            self.token_fallback_seconds,
            Utc::now(),
        ))
    }
}

/// Decode a response body: empty is `null`, non-JSON text is a string.
pub(crate) fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
