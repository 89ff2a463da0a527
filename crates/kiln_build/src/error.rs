//! Error kinds surfaced by the bundle builder and entry point registry.

use kiln_backend::CompileError;
use kiln_common::{Dialect, TargetId};
use kiln_runtime::LoadError;

/// Why a build or an entry point lookup failed.
///
/// Cache store failures never appear here; they are logged and the build
/// continues uncached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No backend or driver can compile the dialect for a target.
    ///
    /// Not a failure of the source; callers usually skip the target.
    #[error("{dialect} is not supported on {target}")]
    UnsupportedDialect {
        /// The requested dialect.
        dialect: Dialect,
        /// The first target that lacks support.
        target: TargetId,
    },

    /// The compiler rejected the source.
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// The runtime rejected the compiled binary.
    #[error("failed to load binary: {0}")]
    Load(#[from] LoadError),

    /// No kernel with the requested name exists in the bundle.
    #[error("no kernel named '{0}' in bundle")]
    NotFound(String),

    /// The requested devices are empty or not part of the bundle's context.
    #[error("invalid device list: {0}")]
    InvalidDevices(String),
}

impl BuildError {
    /// Returns `true` for [`BuildError::UnsupportedDialect`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, BuildError::UnsupportedDialect { .. })
    }

    /// Returns the compiler's build log, if the compiler produced one.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            BuildError::Compile(e) => Some(&e.log),
            _ => None,
        }
    }
}
