/// Constants used throughout the nodecache codebase
// Dispatch defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Detail reported when a worker answers without a payload
pub const EMPTY_RESULT_DETAIL: &str = "empty result";

// Environment variable names
pub const NODECACHE_LOG_VAR: &str = "NODECACHE_LOG";
pub const NODECACHE_MAX_ATTEMPTS_VAR: &str = "NODECACHE_MAX_ATTEMPTS";
pub const NODECACHE_AWAIT_TIMEOUT_MS_VAR: &str = "NODECACHE_AWAIT_TIMEOUT_MS";
pub const NODECACHE_COALESCE_IN_FLIGHT_VAR: &str = "NODECACHE_COALESCE_IN_FLIGHT";
pub const NODECACHE_METADATA_DIR_VAR: &str = "NODECACHE_METADATA_DIR";

// Default configuration file name
pub const CONFIG_FILENAME: &str = "nodecache.json";
