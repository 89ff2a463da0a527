//! Compilation failure reporting.

use kiln_diagnostics::{parse_toolchain_output, Diagnostic};

/// The status code appended to every failed build log.
pub const BUILD_PROGRAM_FAILURE: i32 = -11;

/// Returns the trailer that terminates a failed build log.
pub fn build_failed_footer() -> String {
    format!("\nBuild failed with error code: {BUILD_PROGRAM_FAILURE}\n")
}

/// A backend rejected the source, or could not run at all.
///
/// `log` is the complete build log a caller's log sink receives; it is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{summary}")]
pub struct CompileError {
    /// One-line description of the failure.
    pub summary: String,
    /// Full diagnostic text, ending with the build-failed trailer.
    pub log: String,
    /// Structured diagnostics recovered from the log.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// Creates an error from rendered toolchain output and its diagnostics.
    pub fn build_failed(rendered: &str, diagnostics: Vec<Diagnostic>) -> Self {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let summary = match errors {
            0 => "build failed".to_string(),
            1 => "build failed with 1 error".to_string(),
            n => format!("build failed with {n} errors"),
        };
        Self {
            summary,
            log: format!("{rendered}{}", build_failed_footer()),
            diagnostics,
        }
    }

    /// Creates an error for a failure that has no source location.
    pub fn message(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        let diagnostic = Diagnostic::error(summary.clone(), None);
        Self {
            log: format!("{diagnostic}\n{}", build_failed_footer()),
            diagnostics: vec![diagnostic],
            summary,
        }
    }

    /// Creates an error for a toolchain that stopped before finishing.
    ///
    /// Whatever the toolchain printed before it stopped is kept ahead of the
    /// failure line.
    pub fn aborted(summary: impl Into<String>, output: &str) -> Self {
        let summary = summary.into();
        let failure = Diagnostic::error(summary.clone(), None);
        let mut diagnostics = parse_toolchain_output(output);
        let mut log = output.to_string();
        if !log.is_empty() && !log.ends_with('\n') {
            log.push('\n');
        }
        log.push_str(&format!("{failure}\n{}", build_failed_footer()));
        diagnostics.push(failure);
        Self {
            summary,
            log,
            diagnostics,
        }
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}
