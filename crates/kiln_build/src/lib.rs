//! Online kernel compilation with a persistent binary cache.
//!
//! [`KernelCompiler`] turns a [`SourceBundle`] into an [`ExecutableBundle`]:
//! it fingerprints the source, dialect, targets and flags, serves the binary
//! from the persistent cache when it can, and otherwise compiles it through
//! the configured backends and caches the result. The bundle's entry point
//! registry ([`ExecutableBundle::has_entry`], [`ExecutableBundle::get_entry`])
//! reflects the kernels in the binary itself.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_build::KernelCompiler;
//! use kiln_cache::TraceOutput;
//! use kiln_common::Dialect;
//! use kiln_config::KilnConfig;
//! use kiln_runtime::{Context, HostRuntime};
//!
//! let compiler = KernelCompiler::from_config(&KilnConfig::from_env().unwrap(), TraceOutput::Stderr);
//! let context = Context::with_all_devices(Arc::new(HostRuntime::new()));
//! let bundle = compiler
//!     .build_from_source(&context, Dialect::OpenCl, "__kernel void k(__global int* d) { d[0] = 1; }")
//!     .unwrap();
//! assert_eq!(bundle.kernel("k").unwrap().num_args(), 1);
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod bundle;
pub mod error;
pub mod fingerprint;
pub mod options;
pub mod registry;
pub mod source;

pub use builder::KernelCompiler;
pub use bundle::{ExecutableBundle, Kernel, Origin};
pub use error::BuildError;
pub use fingerprint::fingerprint;
pub use options::CompileOptions;
pub use registry::EntryPoint;
pub use source::SourceBundle;
