//! The compiler adapter interface implemented by every backend.

use crate::error::CompileError;
use kiln_common::{Dialect, TargetId};

/// One compilation: source bytes for a dialect and target, plus build flags.
#[derive(Clone, Copy, Debug)]
pub struct CompileRequest<'a> {
    /// Kernel source. Text for OpenCL C, module bytes for SPIR-V.
    pub source: &'a [u8],
    /// Declared source dialect.
    pub dialect: Dialect,
    /// Target the payload is built for.
    pub target: &'a TargetId,
    /// Build flags, in caller order.
    pub options: &'a [String],
}

impl<'a> CompileRequest<'a> {
    /// Returns the source as UTF-8 text.
    pub fn source_text(&self) -> Result<&'a str, CompileError> {
        std::str::from_utf8(self.source)
            .map_err(|e| CompileError::message(format!("source is not valid UTF-8: {e}")))
    }
}

/// A successful compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileOutput {
    /// SPIR-V module bytes.
    pub payload: Vec<u8>,
    /// Build log; empty when the backend had nothing to report.
    pub log: String,
}

/// A compiler for one or more (dialect, target) pairs.
///
/// Implementations must not panic on malformed input; the backend set
/// converts any panic that escapes into a [`CompileError`] regardless.
pub trait CompilerBackend: Send + Sync {
    /// Stable name used in logs and the CLI.
    fn name(&self) -> &str;

    /// Returns `true` if this backend can compile `dialect` for `target`.
    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool;

    /// Identifies the code generator, including anything that changes its
    /// output for the same request. Part of every cache key.
    fn identity(&self) -> String {
        self.name().to_string()
    }

    /// Returns `true` if the backend's toolchain is installed and runnable.
    fn is_available(&self) -> bool {
        true
    }

    /// Compiles one request.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError>;
}
