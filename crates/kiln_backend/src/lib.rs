//! Backend compiler adapters.
//!
//! A [`CompilerBackend`] turns kernel source of one dialect into a SPIR-V
//! payload for a target, returning the full build log whether it succeeds or
//! fails. [`BackendSet`] holds the configured backends in priority order,
//! answers the capability query, and runs the selected backend with panics
//! converted into [`CompileError`]s.
//!
//! Bundled backends:
//!
//! - [`FrontendBackend`]: OpenCL C through the in-process front end.
//! - [`ToolchainBackend`]: OpenCL C through an external compiler process.
//! - [`SpirvBackend`]: validated passthrough of pre-compiled SPIR-V.

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod flags;
pub mod frontend;
pub mod guard;
pub mod set;
pub mod spirv;
pub mod toolchain;

pub use backend::{CompileOutput, CompileRequest, CompilerBackend};
pub use error::{build_failed_footer, CompileError, BUILD_PROGRAM_FAILURE};
pub use frontend::FrontendBackend;
pub use guard::compile_guarded;
pub use set::BackendSet;
pub use spirv::SpirvBackend;
pub use toolchain::ToolchainBackend;
