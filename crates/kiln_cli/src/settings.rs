//! Configuration resolution for CLI commands.

use std::path::Path;

use kiln_config::{ConfigError, KilnConfig};

use crate::GlobalArgs;

/// File looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "kiln.toml";

/// Loads the configuration: `--config`, else `./kiln.toml` if present, else
/// defaults. Environment variables are applied last and win.
pub fn resolve_config(global: &GlobalArgs) -> Result<KilnConfig, ConfigError> {
    let mut config = match global.config.as_deref() {
        Some(path) => kiln_config::load_config(Path::new(path))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            kiln_config::load_config(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => KilnConfig::default(),
    };
    config.apply_env()?;
    log::debug!(
        "cache {} at {:?}, trace level {}",
        if config.cache.enabled { "enabled" } else { "disabled" },
        config.cache.dir,
        config.cache.trace.0
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[compiler]\ntimeout_secs = 7\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path.display().to_string()),
        };
        let config = resolve_config(&global).unwrap();
        assert_eq!(config.compiler.timeout_secs, 7);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some("/nonexistent/kiln.toml".to_string()),
        };
        assert!(resolve_config(&global).is_err());
    }
}
