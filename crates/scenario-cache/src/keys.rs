//! Key builders for every entry the remote execution client persists.

/// Prefix applied to all keys.
const PREFIX: &str = "scenario_remote";

/// Prefix shared by all upload checkpoint keys.
pub fn upload_record_prefix() -> String {
    format!("{PREFIX}:upload:")
}

/// Key for the upload checkpoint of a normalized local path.
pub fn upload_record(normalized_path: &str) -> String {
    format!("{PREFIX}:upload:{normalized_path}")
}

/// Key for the currently running remote scenario.
pub fn running_scenario() -> String {
    format!("{PREFIX}:running_scenario")
}
