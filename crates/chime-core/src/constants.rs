//! Application-wide constants
//!
//! Centralized location for file names and timing values
//! that are used across multiple modules.

use std::time::Duration;

/// Bursts of remote change notifications closer together than this collapse
/// into a single re-fetch.
pub const SETTINGS_CHANGE_DEBOUNCE: Duration = Duration::from_millis(500);

/// File inside the data dir holding the per-device push flag
pub const USER_PUSH_STORE_FILE: &str = "user_push_store.json";

/// Devices receive notifications until the user opts out
pub const DEFAULT_DEVICE_NOTIFICATIONS_ENABLED: bool = true;

/// Environment variable selecting the tracing filter (EnvFilter syntax)
pub const LOG_FILTER_ENV: &str = "CHIME_LOG";

/// Environment variable enabling the file logging layer
pub const LOG_FILE_ENV: &str = "CHIME_LOG_FILE";
