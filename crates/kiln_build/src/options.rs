//! Caller-supplied build options.

use kiln_diagnostics::LogSink;

/// Build flags plus an optional sink for the build log.
///
/// The sink is filled when the build returns, whether it succeeded or not.
/// A build served from the cache leaves it empty.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Flags passed to the compiler, in order.
    pub flags: Vec<String>,
    /// Receives the build log.
    pub log: Option<LogSink>,
}

impl CompileOptions {
    /// Options with no flags and no log capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one flag.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Appends several flags.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Captures the build log into `sink`.
    pub fn with_log(mut self, sink: LogSink) -> Self {
        self.log = Some(sink);
        self
    }

    pub(crate) fn publish_log(&self, log: &str) {
        if let Some(sink) = &self.log {
            sink.set(log);
        }
    }
}
