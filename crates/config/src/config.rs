//! Dispatch configuration
//!
//! `DispatchConfig` is immutable after loading and is shared by value between the
//! orchestrator and the node transport.

use nodecache_core::{Result, Validate, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound accepted for `max_attempts`
pub const MAX_ATTEMPTS_LIMIT: u32 = 100;

/// Settings for remote task dispatch and result caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Attempts per call before giving up with `NoAvailableNode`
    pub max_attempts: u32,

    /// Bound on a single wait for a node's answer, in milliseconds.
    /// Expiry counts as the node being unreachable. `None` leaves the
    /// bound to the transport.
    pub await_timeout_ms: Option<u64>,

    /// Serialise concurrent calls for the same resource and task type
    pub coalesce_in_flight: bool,

    /// Directory for the file-backed metadata store. `None` keeps entries on
    /// the resources themselves.
    pub metadata_dir: Option<PathBuf>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            await_timeout_ms: None,
            coalesce_in_flight: false,
            metadata_dir: None,
        }
    }
}

impl DispatchConfig {
    pub fn await_timeout(&self) -> Option<Duration> {
        self.await_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        Validate::in_range(self.max_attempts, 1, MAX_ATTEMPTS_LIMIT, "max_attempts")?;
        if let Some(timeout) = self.await_timeout_ms {
            Validate::in_range(timeout, 1, u64::MAX, "await_timeout_ms")?;
        }
        if let Some(dir) = &self.metadata_dir {
            Validate::not_empty(&dir.to_string_lossy(), "metadata_dir")?;
        }
        Ok(())
    }
}

/// Builder for `DispatchConfig`
#[derive(Debug, Default)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Stored in whole milliseconds, truncated. A non-zero timeout below one
    /// millisecond becomes 1ms; a zero timeout is kept and fails `build`.
    pub fn await_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.config.await_timeout_ms = Some(if timeout.is_zero() { 0 } else { millis.max(1) });
        self
    }

    pub fn coalesce_in_flight(mut self, enabled: bool) -> Self {
        self.config.coalesce_in_flight = enabled;
        self
    }

    pub fn metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.metadata_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<DispatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
