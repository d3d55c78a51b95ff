//! Job status polling configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Status poller settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PollingConfig {
    /// Seconds to sleep between status checks.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Maximum number of status checks before giving up.
    #[serde(default = "default_max_checks")]
    #[validate(range(min = 1))]
    pub max_checks: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_checks: default_max_checks(),
        }
    }
}

fn default_interval() -> u64 {
    5
}

fn default_max_checks() -> u32 {
    3600
}
