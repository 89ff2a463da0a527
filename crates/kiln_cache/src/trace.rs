//! User-visible cache trace output.
//!
//! Trace lines are selected by the configured [`TraceLevel`] bitmask and are
//! independent of the `log` filter: a caller that asks for cache tracing gets
//! it on stderr even when no logger is installed.

use std::sync::{Arc, Mutex};

use kiln_config::TraceLevel;

/// Prefix of persistent cache lifecycle lines.
pub const PERSISTENT_PREFIX: &str = "[Persistent Cache]";

/// Prefix of kernel compiler cache lines.
pub const KERNEL_COMPILER_PREFIX: &str = "[kernel_compiler Persistent Cache]";

/// An in-memory capture of trace lines.
#[derive(Clone, Debug, Default)]
pub struct TraceLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl TraceLog {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every captured line, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns `true` if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    /// Discards every captured line.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

/// Where trace lines go.
#[derive(Clone, Debug, Default)]
pub enum TraceOutput {
    /// Print to standard error.
    #[default]
    Stderr,
    /// Record into a [`TraceLog`].
    Capture(TraceLog),
}

/// Emits trace lines for the categories enabled in its level.
#[derive(Clone, Debug, Default)]
pub struct Tracer {
    level: TraceLevel,
    output: TraceOutput,
}

impl Tracer {
    /// Creates a tracer for `level`, writing to `output`.
    pub fn new(level: TraceLevel, output: TraceOutput) -> Self {
        Self { level, output }
    }

    /// Traces a persistent cache lifecycle event.
    pub fn persistent(&self, message: &str) {
        self.emit(TraceLevel::PERSISTENT, PERSISTENT_PREFIX, message);
    }

    /// Traces a kernel compiler cache event.
    pub fn kernel_compiler(&self, message: &str) {
        self.emit(TraceLevel::KERNEL_COMPILER, KERNEL_COMPILER_PREFIX, message);
    }

    fn emit(&self, category: TraceLevel, prefix: &str, message: &str) {
        log::debug!(target: "kiln_cache::trace", "{prefix}: {message}");
        if !self.level.contains(category) {
            return;
        }
        let line = format!("{prefix}: {message}");
        match &self.output {
            TraceOutput::Stderr => eprintln!("{line}"),
            TraceOutput::Capture(log) => log.push(line),
        }
    }
}
