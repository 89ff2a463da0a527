//! Shared fixtures for the build pipeline tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kiln_backend::{
    BackendSet, CompileError, CompileOutput, CompileRequest, CompilerBackend, FrontendBackend,
    SpirvBackend,
};
use kiln_build::KernelCompiler;
use kiln_cache::{PersistentCache, TraceLog, TraceOutput};
use kiln_common::{Dialect, TargetId, OPENCL_BACKEND};
use kiln_config::{CacheConfig, TraceLevel};
use kiln_runtime::{Context, Device, DeviceRuntime, HostRuntime};

pub const INCREMENT: &str = r#"
#define INC1(x) ((x) = (x) + 1);

#define INC10(x)                                                               \
  INC1(x)                                                                      \
  INC1(x)                                                                      \
  INC1(x)

// OpenCL Kernel
__kernel void increment_kernel(__global int* data) {
    int gid = get_global_id(0);
    int value = data[gid];

    INC10(value);
    data[gid] = value;

}
"#;

pub const BAD: &str = r#"
__kernel void my_kernel(__global int *in, __global int *out) {
  size_t i = get_global_id(0) +  no semi-colon!!
  out[i] = in[i]*2 + 100;
}
"#;

/// The exact log a clang-based driver prints for [`BAD`].
pub fn bad_log() -> String {
    let line = "  size_t i = get_global_id(0) +  no semi-colon!!";
    format!(
        "1:3:34: error: use of undeclared identifier 'no'\n{line}\n{}^\n\
         1:3:36: error: expected ';' at end of declaration\n{line}\n{}^\n{};\n\
         \nBuild failed with error code: -11\n",
        " ".repeat(33),
        " ".repeat(35),
        " ".repeat(35),
    )
}

/// Wraps a backend and counts its compile calls.
pub struct Counting {
    inner: Box<dyn CompilerBackend>,
    calls: Arc<AtomicUsize>,
}

impl CompilerBackend for Counting {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        self.inner.supports(dialect, target)
    }

    fn identity(&self) -> String {
        self.inner.identity()
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compile(request)
    }
}

/// The in-process front end under another identity, standing in for a
/// different compiler that accepts the same input.
pub struct Relabeled(pub &'static str);

impl CompilerBackend for Relabeled {
    fn name(&self) -> &str {
        self.0
    }

    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        FrontendBackend::new().supports(dialect, target)
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        FrontendBackend::new().compile(request)
    }
}

/// A compiler whose backends share one call counter.
pub struct Harness {
    pub compiler: KernelCompiler,
    pub calls: Arc<AtomicUsize>,
    pub trace: TraceLog,
}

impl Harness {
    /// Caching in `dir` when given, uncached otherwise. Traces every category.
    pub fn new(dir: Option<&Path>) -> Self {
        Self::with_config(&cache_config(dir))
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self::with_backend(config, Box::new(FrontendBackend::new()))
    }

    /// Uses `opencl` for OpenCL C, followed by the SPIR-V passthrough.
    pub fn with_backend(config: &CacheConfig, opencl: Box<dyn CompilerBackend>) -> Self {
        let trace = TraceLog::new();
        let cache = PersistentCache::open(config, TraceOutput::Capture(trace.clone()))
            .expect("cache opens");
        let calls = Arc::new(AtomicUsize::new(0));
        let backends = BackendSet::new()
            .with(Counting {
                inner: opencl,
                calls: calls.clone(),
            })
            .with(Counting {
                inner: Box::new(SpirvBackend::new()),
                calls: calls.clone(),
            });
        Self {
            compiler: KernelCompiler::new(backends, cache),
            calls,
            trace,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Caching in `dir` when given, tracing every category.
pub fn cache_config(dir: Option<&Path>) -> CacheConfig {
    CacheConfig {
        enabled: dir.is_some(),
        dir: dir.map(Path::to_path_buf),
        trace: TraceLevel(5),
        max_size: 0,
    }
}

/// Rewrites the version word of a little-endian SPIR-V module.
pub fn with_spirv_version(module: &[u8], major: u8, minor: u8) -> Vec<u8> {
    let mut bytes = module.to_vec();
    let word = (u32::from(major) << 16) | (u32::from(minor) << 8);
    bytes[4..8].copy_from_slice(&word.to_le_bytes());
    bytes
}

/// A context over the default host device.
pub fn host_context() -> Context {
    Context::with_all_devices(Arc::new(HostRuntime::new()))
}

/// A context over two host devices with different names.
pub fn two_device_context() -> Context {
    let devices = ["cpu0", "cpu1"]
        .iter()
        .map(|name| Device::new(TargetId::new(OPENCL_BACKEND, *name, "1.0"), "kiln"))
        .collect();
    let runtime: Arc<dyn DeviceRuntime> = Arc::new(HostRuntime::with_devices(devices));
    Context::with_all_devices(runtime)
}
