//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod api;
pub mod logging;
pub mod polling;
pub mod store;
pub mod transfer;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::api::ApiConfig;
pub use self::logging::LoggingConfig;
pub use self::polling::PollingConfig;
pub use self::store::StoreConfig;
pub use self::transfer::TransferConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Remote service endpoints and authentication.
    #[serde(default)]
    pub api: ApiConfig,
    /// Chunked upload and output download settings.
    #[serde(default)]
    #[validate(nested)]
    pub transfer: TransferConfig,
    /// Job status polling settings.
    #[serde(default)]
    #[validate(nested)]
    pub polling: PollingConfig,
    /// Local key-value store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `SCENARIO__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SCENARIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }
}
