//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::path::Path;

/// Loads and validates a `kiln.toml` configuration file.
pub fn load_config(path: &Path) -> Result<KilnConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are consistent.
pub(crate) fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if let Some(ref toolchain) = config.compiler.toolchain {
        if toolchain.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "compiler.toolchain.program is empty".to_string(),
            ));
        }
        if !toolchain.args.iter().any(|a| a.contains("{output}")) {
            return Err(ConfigError::ValidationError(
                "compiler.toolchain.args must contain an {output} placeholder".to_string(),
            ));
        }
    }
    Ok(())
}
