//! Environment variable overlay.
//!
//! Environment values take precedence over `kiln.toml`. The lookup function is
//! injectable so tests can describe an environment without touching the
//! process-wide one.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::loader::validate_config;
use crate::types::{KilnConfig, TraceLevel};

/// Enables the persistent cache (`1`/`true`/`on`).
pub const CACHE_PERSISTENT: &str = "KILN_CACHE_PERSISTENT";
/// Cache root directory.
pub const CACHE_DIR: &str = "KILN_CACHE_DIR";
/// Trace bitmask.
pub const CACHE_TRACE: &str = "KILN_CACHE_TRACE";
/// Cache directory byte budget.
pub const CACHE_MAX_SIZE: &str = "KILN_CACHE_MAX_SIZE";
/// External compiler timeout, in seconds.
pub const COMPILE_TIMEOUT: &str = "KILN_COMPILE_TIMEOUT";

/// Subdirectory appended to the platform cache root when no directory is set.
const DEFAULT_SUBDIR: &str = "kiln";

impl KilnConfig {
    /// Builds a configuration from the process environment alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = KilnConfig::default();
        config.apply_env_with(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlays values from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlays values obtained from `lookup`.
    ///
    /// Trace and size variables are read only when the cache ends up enabled;
    /// a disabled cache ignores them even if they are malformed.
    ///
    /// Also fills in the default cache directory (`$XDG_CACHE_HOME/kiln`, then
    /// `$HOME/.cache/kiln`) when none has been configured.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CACHE_PERSISTENT) {
            self.cache.enabled = parse_bool(CACHE_PERSISTENT, &value)?;
        }
        if let Some(value) = lookup(CACHE_DIR) {
            if !value.is_empty() {
                self.cache.dir = Some(PathBuf::from(value));
            }
        }
        if self.cache.enabled {
            if let Some(value) = lookup(CACHE_TRACE) {
                self.cache.trace = TraceLevel(parse_int(CACHE_TRACE, &value)?);
            }
            if let Some(value) = lookup(CACHE_MAX_SIZE) {
                self.cache.max_size = parse_int(CACHE_MAX_SIZE, &value)?;
            }
        }
        if let Some(value) = lookup(COMPILE_TIMEOUT) {
            self.compiler.timeout_secs = parse_int(COMPILE_TIMEOUT, &value)?;
        }

        if self.cache.dir.is_none() {
            self.cache.dir = default_cache_dir(&lookup);
        }

        validate_config(self)
    }
}

fn default_cache_dir<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(xdg) = lookup("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join(DEFAULT_SUBDIR));
    }
    lookup("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".cache").join(DEFAULT_SUBDIR))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected 0 or 1".to_string(),
        }),
    }
}

fn parse_int<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}
