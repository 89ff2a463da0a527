mod common;

use std::sync::Arc;

use kiln_build::{BuildError, CompileOptions, Origin, SourceBundle};
use kiln_common::Dialect;
use kiln_runtime::{Context, HostRuntime};

use common::{
    cache_config, host_context, two_device_context, with_spirv_version, Harness, Relabeled, INCREMENT,
};

#[test]
fn second_build_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();

    let first = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 1);
    assert_eq!(first.origin(), Origin::Compiled);

    let second = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 1, "cache hit must not compile");
    assert_eq!(second.origin(), Origin::Cache);
    assert_eq!(first.payload(), second.payload());
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn cache_trace_order() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();
    assert!(h.trace.contains("[Persistent Cache]: enabled"));

    h.trace.clear();
    h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(
        h.trace.lines(),
        ["[kernel_compiler Persistent Cache]: binary has been cached"]
    );

    h.trace.clear();
    h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(
        h.trace.lines(),
        ["[kernel_compiler Persistent Cache]: using cached binary"]
    );
}

#[test]
fn a_new_compiler_reuses_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = host_context();
    let first = Harness::new(Some(dir.path()));
    first.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();

    let second = Harness::new(Some(dir.path()));
    let bundle = second.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(second.calls(), 0);
    assert_eq!(bundle.origin(), Origin::Cache);
}

#[test]
fn changing_source_options_or_target_misses() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = two_device_context();
    let devices = ctx.devices().to_vec();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, INCREMENT);

    let base = h.compiler.build(&bundle, &devices[..1], &CompileOptions::new()).unwrap();
    assert_eq!(h.calls(), 1);

    let edited = SourceBundle::new(&ctx, Dialect::OpenCl, format!("{INCREMENT}\n// edited\n"));
    let by_source = h.compiler.build(&edited, &devices[..1], &CompileOptions::new()).unwrap();
    assert_eq!(h.calls(), 2);

    let flagged = CompileOptions::new().flag("-cl-fast-relaxed-math");
    let by_options = h.compiler.build(&bundle, &devices[..1], &flagged).unwrap();
    assert_eq!(h.calls(), 3);

    let by_target = h.compiler.build(&bundle, &devices[1..], &CompileOptions::new()).unwrap();
    assert_eq!(h.calls(), 4);

    let fps = [
        base.fingerprint(),
        by_source.fingerprint(),
        by_options.fingerprint(),
        by_target.fingerprint(),
    ];
    for (i, a) in fps.iter().enumerate() {
        for b in &fps[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(h.compiler.cache().stats().unwrap().entries, 4);
}

#[test]
fn device_order_does_not_change_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = two_device_context();
    let mut devices = ctx.devices().to_vec();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, INCREMENT);

    let a = h.compiler.build(&bundle, &devices, &CompileOptions::new()).unwrap();
    devices.reverse();
    let b = h.compiler.build(&bundle, &devices, &CompileOptions::new()).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(h.calls(), 1);
    assert_eq!(b.devices().len(), 2);
}

#[test]
fn disabled_cache_compiles_every_time_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let h = Harness::with_config(&kiln_config::CacheConfig {
        enabled: false,
        dir: Some(cache_dir.clone()),
        trace: kiln_config::TraceLevel(5),
        max_size: 0,
    });
    let ctx = host_context();

    let a = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    let b = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 2);
    assert_eq!(a.origin(), Origin::Compiled);
    assert_eq!(b.origin(), Origin::Compiled);
    assert_eq!(a.payload(), b.payload());
    assert!(!cache_dir.exists());
    assert!(h.trace.lines().is_empty());
}

#[test]
fn cached_and_uncached_builds_agree() {
    let dir = tempfile::tempdir().unwrap();
    let cached = Harness::new(Some(dir.path()));
    let uncached = Harness::new(None);
    let ctx = host_context();

    let a = cached.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    let b = uncached.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(a.payload(), b.payload());
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn unsupported_dialect_skips_compiler_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    h.trace.clear();
    let ctx = host_context();

    assert!(!h.compiler.can_compile(&ctx, Dialect::Sycl));
    let err = h
        .compiler
        .build_from_source(&ctx, Dialect::Sycl, "int main() {}")
        .unwrap_err();
    assert!(err.is_unsupported(), "{err}");
    assert_eq!(h.calls(), 0);
    assert!(h.trace.lines().is_empty());
    assert_eq!(h.compiler.cache().stats().unwrap().entries, 0);
}

#[test]
fn driver_without_opencl_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let runtime = Arc::new(HostRuntime::new().with_dialects(&[Dialect::Spirv]));
    let ctx = Context::with_all_devices(runtime);

    assert!(!h.compiler.can_compile(&ctx, Dialect::OpenCl));
    assert!(h.compiler.can_compile(&ctx, Dialect::Spirv));
    let err = h
        .compiler
        .build_from_source(&ctx, Dialect::OpenCl, INCREMENT)
        .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedDialect { dialect: Dialect::OpenCl, .. }));
    assert_eq!(h.calls(), 0);
}

#[test]
fn device_list_must_belong_to_the_context() {
    let h = Harness::new(None);
    let ctx = host_context();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, INCREMENT);

    let err = h.compiler.build(&bundle, &[], &CompileOptions::new()).unwrap_err();
    assert!(matches!(err, BuildError::InvalidDevices(_)));

    let foreign = kiln_runtime::Device::new(
        kiln_common::TargetId::new("opencl", "elsewhere", "1"),
        "acme",
    );
    let err = h.compiler.build(&bundle, &[foreign], &CompileOptions::new()).unwrap_err();
    assert!(matches!(err, BuildError::InvalidDevices(_)));
    assert_eq!(h.calls(), 0);
}

#[test]
fn corrupt_cache_entry_is_recompiled() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();

    let first = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    let path = h
        .compiler
        .cache()
        .dir()
        .unwrap()
        .join(format!("{}.bin", first.fingerprint()));
    let mut raw = std::fs::read(&path).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xff;
    std::fs::write(&path, raw).unwrap();

    let second = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 2);
    assert_eq!(second.origin(), Origin::Compiled);
    assert_eq!(first.payload(), second.payload());
}

#[test]
fn cached_payload_the_runtime_rejects_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();

    let first = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    h.compiler
        .cache()
        .store(&first.fingerprint(), b"not a spir-v module")
        .unwrap();

    let second = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 2);
    assert_eq!(second.origin(), Origin::Compiled);

    let third = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(h.calls(), 2);
    assert_eq!(third.origin(), Origin::Cache);
    assert_eq!(third.payload(), first.payload());
}

#[test]
fn concurrent_identical_builds_agree() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();

    let payloads: Vec<Vec<u8>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    h.compiler
                        .build_from_source(&ctx, Dialect::OpenCl, INCREMENT)
                        .unwrap()
                        .payload()
                        .to_vec()
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert!(payloads.windows(2).all(|w| w[0] == w[1]));
    assert!(h.calls() >= 1 && h.calls() <= 8);
    assert_eq!(h.compiler.cache().stats().unwrap().entries, 1);
}

#[test]
fn spirv_source_builds_through_passthrough() {
    let h = Harness::new(None);
    let ctx = host_context();
    let compiled = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();

    let reloaded = h
        .compiler
        .build_from_source(&ctx, Dialect::Spirv, compiled.payload().to_vec())
        .unwrap();
    assert_eq!(reloaded.payload(), compiled.payload());
    assert!(reloaded.has_entry("increment_kernel"));
}

#[test]
fn fresh_payload_the_runtime_rejects_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();
    let compiled = Harness::new(None)
        .compiler
        .build_from_source(&ctx, Dialect::OpenCl, INCREMENT)
        .unwrap();
    let too_new = with_spirv_version(compiled.payload(), 1, 6);

    h.trace.clear();
    let err = h
        .compiler
        .build_from_source(&ctx, Dialect::Spirv, too_new)
        .unwrap_err();
    assert!(matches!(err, BuildError::Load(_)), "{err}");
    assert_eq!(h.calls(), 1);
    assert_eq!(h.compiler.cache().stats().unwrap().entries, 0);
    assert!(!h.trace.contains("binary has been cached"));
}

#[test]
fn another_compiler_does_not_reuse_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = host_context();
    let frontend = Harness::new(Some(dir.path()));
    let a = frontend.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();

    let other = Harness::with_backend(&cache_config(Some(dir.path())), Box::new(Relabeled("clang-spirv")));
    let b = other.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    assert_eq!(other.calls(), 1);
    assert_eq!(b.origin(), Origin::Compiled);
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(other.compiler.cache().stats().unwrap().entries, 2);
}
