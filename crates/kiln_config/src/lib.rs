//! Configuration for the kiln kernel compiler.
//!
//! Settings come from an optional `kiln.toml` file and are then overlaid with
//! `KILN_*` environment variables. The resulting [`KilnConfig`] is an explicit
//! value handed to the cache store and the builder at construction.

#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
