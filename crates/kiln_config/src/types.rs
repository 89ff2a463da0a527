//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-invocation timeout for external compilers, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// The top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KilnConfig {
    /// Persistent cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Backend compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Persistent binary cache settings.
///
/// When `enabled` is false, every other field is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Whether compiled binaries are persisted and reused.
    #[serde(default)]
    pub enabled: bool,
    /// Cache root directory. Filled from the environment when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Trace output selection.
    #[serde(default)]
    pub trace: TraceLevel,
    /// Byte budget for the cache directory; `0` means unlimited.
    #[serde(default)]
    pub max_size: u64,
}

/// Bitmask selecting which cache events are traced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TraceLevel(pub u32);

impl TraceLevel {
    /// No trace output.
    pub const OFF: TraceLevel = TraceLevel(0);
    /// Persistent cache lifecycle events (enablement, directory problems, eviction).
    pub const PERSISTENT: TraceLevel = TraceLevel(1);
    /// Kernel compiler cache hits and writes.
    pub const KERNEL_COMPILER: TraceLevel = TraceLevel(4);

    /// Returns `true` if every bit of `other` is set in `self`.
    pub fn contains(self, other: TraceLevel) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

/// Backend compiler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Timeout for a single external compiler invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// External toolchain used for OpenCL C instead of the in-process front end.
    #[serde(default)]
    pub toolchain: Option<ToolchainConfig>,
}

impl CompilerConfig {
    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            toolchain: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// An external compiler command line.
///
/// `{input}` and `{output}` in `args` are replaced with the paths of the
/// temporary source file and the expected SPIR-V output file. Caller build
/// flags are appended after `args`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainConfig {
    /// Executable name or path.
    pub program: String,
    /// Argument template.
    #[serde(default = "default_toolchain_args")]
    pub args: Vec<String>,
}

fn default_toolchain_args() -> Vec<String> {
    [
        "--target=spirv64",
        "-x",
        "cl",
        "-c",
        "{input}",
        "-o",
        "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
