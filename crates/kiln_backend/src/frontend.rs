//! Backend that compiles OpenCL C with the in-process front end.

use crate::backend::{CompileOutput, CompileRequest, CompilerBackend};
use crate::error::CompileError;
use crate::flags::parse_flags;
use kiln_common::{Dialect, TargetId};
use kiln_diagnostics::render_all;
use kiln_spirv::ModuleWriter;

/// Buffer name used in rendered diagnostics.
const SOURCE_NAME: &str = "1";

/// Compiles OpenCL C to an interface-only SPIR-V module in process.
///
/// Always available. The emitted module declares every kernel with its
/// parameter types and records accepted build flags as processing steps, so
/// the payload identifies exactly what produced it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontendBackend;

impl FrontendBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl CompilerBackend for FrontendBackend {
    fn name(&self) -> &str {
        "frontend"
    }

    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        dialect == Dialect::OpenCl && target.consumes_spirv()
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        let flags = parse_flags(request.options)?;
        let source = request.source_text()?;

        let translation = kiln_frontend::analyze(source, &flags.frontend);
        let rendered = render_all(&translation.diagnostics, SOURCE_NAME, source);
        if translation.has_errors() {
            log::debug!(
                "front end rejected source for {}: {} error(s)",
                request.target,
                translation.error_count()
            );
            return Err(CompileError::build_failed(&rendered, translation.diagnostics));
        }

        let mut writer = ModuleWriter::new(flags.cl_version);
        for step in flags.processed {
            writer.processed(step);
        }
        for kernel in translation.kernels {
            writer.kernel(kernel);
        }
        Ok(CompileOutput {
            payload: writer.to_bytes(),
            log: rendered,
        })
    }
}
