//! Bearer token lifetime.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};

/// A bearer token and the instant it should be considered expired.
#[derive(Clone)]
pub struct TokenState {
    /// Raw bearer token.
    pub token: String,
    /// Expiry with the configured skew already subtracted.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenState {
    /// Build a token state.
    ///
    /// Expiry comes from `expires_in` when the login response carried it,
    /// otherwise from the JWT `exp` claim, otherwise `fallback_seconds`
    /// from `now`. `skew_seconds` is subtracted in every case. An
    /// `expires_in` that does not fit a timestamp is ignored in favour of
    /// the fallback lifetime.
    pub fn new(
        token: String,
        expires_in: Option<i64>,
        skew_seconds: i64,
        fallback_seconds: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let after = |secs: i64| TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
        let fallback = after(fallback_seconds).unwrap_or(now);
        let raw_expiry = match expires_in {
            Some(secs) => after(secs).unwrap_or(fallback),
            None => jwt_expiry(&token).unwrap_or(fallback),
        };
        let expires_at = TimeDelta::try_seconds(skew_seconds)
            .and_then(|skew| raw_expiry.checked_sub_signed(skew))
            .unwrap_or(raw_expiry);
        Self { token, expires_at }
    }

    /// Whether the token can still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Decode the `exp` claim of a JWT without verifying its signature.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_f64()?;
    DateTime::from_timestamp(exp as i64, 0)
}
