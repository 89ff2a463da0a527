//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating kiln configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        /// The variable name.
        name: String,
        /// The offending value.
        value: String,
        /// What was expected instead.
        reason: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
