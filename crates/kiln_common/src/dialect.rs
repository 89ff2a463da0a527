//! Kernel source dialects accepted by the build pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The source language of a kernel bundle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// OpenCL C, the restricted C-like kernel language.
    OpenCl,
    /// A pre-compiled SPIR-V module supplied as source bytes.
    Spirv,
    /// SYCL C++ source. Recognised but not compiled by any bundled backend.
    Sycl,
}

impl Dialect {
    /// All known dialects, in declaration order.
    pub const ALL: [Dialect; 3] = [Dialect::OpenCl, Dialect::Spirv, Dialect::Sycl];

    /// Returns the stable name used in configuration, the CLI, and fingerprints.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::OpenCl => "opencl",
            Dialect::Spirv => "spirv",
            Dialect::Sycl => "sycl",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a dialect name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source dialect '{0}'")]
pub struct ParseDialectError(pub String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opencl" | "cl" | "opencl-c" => Ok(Dialect::OpenCl),
            "spirv" | "spir-v" => Ok(Dialect::Spirv),
            "sycl" => Ok(Dialect::Sycl),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}
