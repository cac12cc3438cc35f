//! Configuration loader for nodecache
//!
//! Loads `DispatchConfig` at startup: defaults, then the JSON file (if any), then
//! `NODECACHE_*` environment overrides, then validation.

use crate::config::DispatchConfig;
use nodecache_core::{
    constants::{
        CONFIG_FILENAME, NODECACHE_AWAIT_TIMEOUT_MS_VAR, NODECACHE_COALESCE_IN_FLIGHT_VAR,
        NODECACHE_MAX_ATTEMPTS_VAR, NODECACHE_METADATA_DIR_VAR,
    },
    Error, Result,
};
use std::path::{Path, PathBuf};

/// Configuration loader that handles all startup configuration
pub struct ConfigLoader {
    /// Explicit configuration file
    file: Option<PathBuf>,
    /// Directory searched for `nodecache.json` when no file is given
    directory: Option<PathBuf>,
    /// Whether `NODECACHE_*` variables override file values
    apply_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            directory: None,
            apply_env: true,
        }
    }

    /// Load from this file; it must exist
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Look for `nodecache.json` in this directory; a missing file is not an error
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    pub fn apply_env(mut self, apply: bool) -> Self {
        self.apply_env = apply;
        self
    }

    /// Load the configuration
    pub fn load(self) -> Result<DispatchConfig> {
        let mut config = match self.config_file()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading dispatch configuration");
                Self::read_file(&path)?
            }
            None => DispatchConfig::default(),
        };

        if self.apply_env {
            Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        config.validate()?;
        Ok(config)
    }

    fn config_file(&self) -> Result<Option<PathBuf>> {
        if let Some(file) = &self.file {
            if !file.is_file() {
                return Err(Error::configuration(format!(
                    "configuration file '{}' does not exist",
                    file.display()
                )));
            }
            return Ok(Some(file.clone()));
        }

        let candidate = self
            .directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .map(|dir| dir.join(CONFIG_FILENAME));

        Ok(candidate.filter(|path| path.is_file()))
    }

    fn read_file(path: &Path) -> Result<DispatchConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read configuration", e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::json(
                format!("invalid configuration in '{}'", path.display()),
                e,
            )
        })
    }

    /// Apply overrides from a variable lookup; split out so tests can pass a map
    pub fn apply_env_overrides<F>(config: &mut DispatchConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(NODECACHE_MAX_ATTEMPTS_VAR) {
            config.max_attempts = parse_number(NODECACHE_MAX_ATTEMPTS_VAR, &value)?;
        }
        if let Some(value) = lookup(NODECACHE_AWAIT_TIMEOUT_MS_VAR) {
            config.await_timeout_ms = if value.trim().is_empty() {
                None
            } else {
                Some(parse_number(NODECACHE_AWAIT_TIMEOUT_MS_VAR, &value)?)
            };
        }
        if let Some(value) = lookup(NODECACHE_COALESCE_IN_FLIGHT_VAR) {
            config.coalesce_in_flight = parse_bool(NODECACHE_COALESCE_IN_FLIGHT_VAR, &value)?;
        }
        if let Some(value) = lookup(NODECACHE_METADATA_DIR_VAR) {
            config.metadata_dir = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{name} must be a number, got '{value}'")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}
