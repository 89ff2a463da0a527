//! Selection among the configured backends.

use std::sync::Arc;

use kiln_common::{Dialect, TargetId};
use kiln_config::CompilerConfig;

use crate::backend::{CompileOutput, CompileRequest, CompilerBackend};
use crate::error::CompileError;
use crate::frontend::FrontendBackend;
use crate::guard::compile_guarded;
use crate::spirv::SpirvBackend;
use crate::toolchain::ToolchainBackend;

/// An ordered list of backends; the first that supports a request wins.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: Vec<Arc<dyn CompilerBackend>>,
}

impl BackendSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard set for `config`.
    ///
    /// A configured external toolchain comes first so it takes OpenCL C
    /// requests whenever it is installed; the in-process front end and the
    /// SPIR-V passthrough follow.
    pub fn from_config(config: &CompilerConfig) -> Self {
        let mut set = Self::new();
        if let Some(toolchain) = &config.toolchain {
            set = set.with(ToolchainBackend::new(toolchain, config.timeout()));
        }
        set.with(FrontendBackend::new()).with(SpirvBackend::new())
    }

    /// Appends a backend.
    pub fn with(self, backend: impl CompilerBackend + 'static) -> Self {
        self.with_shared(Arc::new(backend))
    }

    /// Appends a shared backend.
    pub fn with_shared(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// The backends in priority order.
    pub fn backends(&self) -> &[Arc<dyn CompilerBackend>] {
        &self.backends
    }

    /// Returns the first available backend that supports `dialect` on `target`.
    pub fn select(&self, dialect: Dialect, target: &TargetId) -> Option<&dyn CompilerBackend> {
        self.backends
            .iter()
            .map(|b| b.as_ref())
            .find(|b| b.supports(dialect, target) && b.is_available())
    }

    /// Capability query: can any backend compile `dialect` for `target`?
    pub fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        self.select(dialect, target).is_some()
    }

    /// Compiles with the selected backend, capturing panics.
    pub fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        let backend = self.select(request.dialect, request.target).ok_or_else(|| {
            CompileError::message(format!(
                "no compiler backend for {} on {}",
                request.dialect, request.target
            ))
        })?;
        log::debug!(
            "compiling {} for {} with backend '{}'",
            request.dialect,
            request.target,
            backend.name()
        );
        compile_guarded(backend, request)
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.name()))
            .finish()
    }
}
