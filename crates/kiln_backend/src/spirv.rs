//! Backend for pre-compiled SPIR-V supplied as source.

use crate::backend::{CompileOutput, CompileRequest, CompilerBackend};
use crate::error::CompileError;
use kiln_common::{Dialect, TargetId};
use kiln_diagnostics::Diagnostic;

/// Validates a SPIR-V module and passes it through unchanged.
///
/// Build flags have no effect on an already compiled module; each one is
/// reported in the log as unused.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpirvBackend;

impl SpirvBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl CompilerBackend for SpirvBackend {
    fn name(&self) -> &str {
        "spirv"
    }

    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        dialect == Dialect::Spirv && target.consumes_spirv()
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        let module = kiln_spirv::parse(request.source)
            .map_err(|e| CompileError::message(format!("invalid SPIR-V module: {e}")))?;
        log::debug!(
            "validated SPIR-V {}.{} module with {} entry point(s)",
            module.version.0,
            module.version.1,
            module.entry_points.len()
        );

        let log: String = request
            .options
            .iter()
            .map(|flag| {
                let warning =
                    Diagnostic::warning(format!("argument unused during compilation: '{flag}'"), None);
                format!("{warning}\n")
            })
            .collect();
        Ok(CompileOutput {
            payload: request.source.to_vec(),
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_spirv::{ArgType, KernelInterface, ModuleWriter};

    fn module() -> Vec<u8> {
        let mut writer = ModuleWriter::new(120);
        writer.kernel(KernelInterface {
            name: "scale".to_string(),
            param_names: vec!["x".to_string()],
            params: vec![ArgType::float()],
        });
        writer.to_bytes()
    }

    fn compile(source: &[u8], options: &[String]) -> Result<CompileOutput, CompileError> {
        let target = TargetId::new("level_zero", "gpu", "1.3");
        SpirvBackend.compile(&CompileRequest {
            source,
            dialect: Dialect::Spirv,
            target: &target,
            options,
        })
    }

    #[test]
    fn passes_module_through() {
        let bytes = module();
        let out = compile(&bytes, &[]).unwrap();
        assert_eq!(out.payload, bytes);
        assert!(out.log.is_empty());
    }

    #[test]
    fn flags_are_reported_unused() {
        let out = compile(&module(), &["-cl-mad-enable".to_string()]).unwrap();
        assert_eq!(
            out.log,
            "warning: argument unused during compilation: '-cl-mad-enable'\n"
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = compile(b"__kernel void k() {}", &[]).unwrap_err();
        assert!(err.summary.starts_with("invalid SPIR-V module: "), "{}", err.summary);
        assert!(err.log.ends_with("Build failed with error code: -11\n"));
    }
}
