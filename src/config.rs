//! Configuration constants and utilities for hacline
//!
//! Connection details live in the profile file (see [`crate::profile`]); this
//! module only holds defaults and the environment variables that override them.

use std::time::Duration;

/// Default profile file path for hacline
pub const DEFAULT_PROFILE_PATH: &str = "~/.hacline/profile";

/// Environment variable name for overriding the profile path
pub const PROFILE_PATH_ENV_VAR: &str = "HACLINE_PROFILE_PATH";

/// Environment variable holding the log filter (e.g. `debug`, `hacline=trace`)
pub const LOG_LEVEL_ENV_VAR: &str = "HACLINE_LOG_LEVEL";

/// Log filter used when [`LOG_LEVEL_ENV_VAR`] is unset
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Request timeout when neither the profile nor the command sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Row limit for flexible search queries
pub const DEFAULT_MAX_ROWS: u32 = 200;

/// Get the profile file path, checking environment variable first, then falling back to default
pub fn get_profile_path() -> String {
    std::env::var_os(PROFILE_PATH_ENV_VAR)
        .and_then(|val| val.into_string().ok())
        .unwrap_or_else(|| DEFAULT_PROFILE_PATH.to_string())
}

/// Get the log filter, checking environment variable first
pub fn get_log_level() -> String {
    std::env::var(LOG_LEVEL_ENV_VAR)
        .map(|level| level.to_lowercase())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}
