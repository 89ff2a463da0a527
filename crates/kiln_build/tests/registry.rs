mod common;

use kiln_build::BuildError;
use kiln_common::Dialect;

use common::{host_context, Harness, INCREMENT};

#[test]
fn single_kernel_bundle_has_exactly_that_entry() {
    let h = Harness::new(None);
    let ctx = host_context();
    let bundle = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();

    assert!(bundle.has_entry("increment_kernel"));
    assert!(!bundle.has_entry("not_exist"));
    assert_eq!(bundle.entry_points().len(), 1);

    let entry = bundle.get_entry("increment_kernel").unwrap();
    assert_eq!(entry.arg_count, 1);
    assert_eq!(entry.arg_types[0].to_string(), "__global int*");

    let kernel = bundle.kernel("increment_kernel").unwrap();
    assert_eq!(kernel.num_args(), 1);
    assert_eq!(kernel.name(), "increment_kernel");
}

#[test]
fn missing_entry_is_not_found() {
    let h = Harness::new(None);
    let ctx = host_context();
    let bundle = h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();

    assert_eq!(
        bundle.get_entry("not_exist"),
        Err(BuildError::NotFound("not_exist".to_string()))
    );
    assert!(matches!(bundle.kernel("not_exist"), Err(BuildError::NotFound(_))));
    // Lookups do not disturb the index.
    assert!(bundle.has_entry("increment_kernel"));
}

#[test]
fn cached_bundle_reflects_its_own_kernels() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();
    let two = "__kernel void a(__global float* x) {}\n__kernel void b(int n, float4 v) {}\n";

    h.compiler.build_from_source(&ctx, Dialect::OpenCl, INCREMENT).unwrap();
    h.compiler.build_from_source(&ctx, Dialect::OpenCl, two).unwrap();
    let cached = h.compiler.build_from_source(&ctx, Dialect::OpenCl, two).unwrap();

    let names: Vec<&str> = cached.entry_points().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(!cached.has_entry("increment_kernel"));
    let b = cached.kernel("b").unwrap();
    assert_eq!(b.num_args(), 2);
    let types: Vec<String> = b.arg_types().iter().map(|t| t.to_string()).collect();
    assert_eq!(types, ["int", "float4"]);
}

#[test]
fn helper_functions_are_not_entries() {
    let h = Harness::new(None);
    let ctx = host_context();
    let source = "int twice(int x) { return x * 2; }\n\
                  __kernel void run(__global int* d) { d[0] = twice(d[0]); }\n";
    let bundle = h.compiler.build_from_source(&ctx, Dialect::OpenCl, source).unwrap();
    assert!(bundle.has_entry("run"));
    assert!(!bundle.has_entry("twice"));
}
