//! Conversion of backend panics into compile errors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::backend::{CompileOutput, CompileRequest, CompilerBackend};
use crate::error::CompileError;

/// Runs `backend.compile`, turning a panic into a [`CompileError`].
///
/// Backends hold no state that a panic could leave half-updated, so
/// asserting unwind safety is sound.
pub fn compile_guarded(
    backend: &dyn CompilerBackend,
    request: &CompileRequest<'_>,
) -> Result<CompileOutput, CompileError> {
    match panic::catch_unwind(AssertUnwindSafe(|| backend.compile(request))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::warn!("backend '{}' panicked: {message}", backend.name());
            Err(CompileError::message(format!(
                "compiler backend '{}' crashed: {message}",
                backend.name()
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::{Dialect, TargetId};

    struct Panicking;

    impl CompilerBackend for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn supports(&self, _: Dialect, _: &TargetId) -> bool {
            true
        }

        fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
            panic!("index out of range: {}", request.source.len());
        }
    }

    #[test]
    fn panic_becomes_compile_error() {
        let target = TargetId::new("opencl", "cpu", "1");
        let request = CompileRequest {
            source: b"abc",
            dialect: Dialect::OpenCl,
            target: &target,
            options: &[],
        };
        let err = compile_guarded(&Panicking, &request).unwrap_err();
        assert_eq!(err.summary, "compiler backend 'panicking' crashed: index out of range: 3");
        assert!(err.log.contains("crashed"));
    }
}
