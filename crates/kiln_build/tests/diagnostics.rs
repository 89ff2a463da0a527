mod common;

use kiln_build::{BuildError, CompileOptions, SourceBundle};
use kiln_common::Dialect;
use kiln_diagnostics::LogSink;

use common::{bad_log, host_context, Harness, BAD, INCREMENT};

#[test]
fn malformed_source_reports_clang_log() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();
    let sink = LogSink::new();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, BAD);

    let err = h
        .compiler
        .build(&bundle, ctx.devices(), &CompileOptions::new().with_log(sink.clone()))
        .unwrap_err();
    assert!(matches!(err, BuildError::Compile(_)), "{err}");
    assert_eq!(sink.contents(), bad_log());
    assert_eq!(err.build_log(), Some(bad_log().as_str()));
    assert!(sink.contents().contains("use of undeclared identifier 'no'"));
}

#[test]
fn failed_build_leaves_no_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();

    for _ in 0..2 {
        assert!(h.compiler.build_from_source(&ctx, Dialect::OpenCl, BAD).is_err());
    }
    assert_eq!(h.calls(), 2);
    assert_eq!(h.compiler.cache().stats().unwrap().entries, 0);
    assert!(!h.trace.contains("binary has been cached"));
    let leftovers = std::fs::read_dir(h.compiler.cache().dir().unwrap()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn log_sink_is_written_on_every_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(dir.path()));
    let ctx = host_context();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, INCREMENT);

    let sink = LogSink::new();
    sink.set("stale");
    let options = CompileOptions::new().with_log(sink.clone());
    h.compiler.build(&bundle, ctx.devices(), &options).unwrap();
    assert_eq!(sink.contents(), "");

    sink.set("stale");
    h.compiler.build(&bundle, ctx.devices(), &options).unwrap();
    assert_eq!(sink.contents(), "", "a cache hit leaves an empty log");

    let sycl = SourceBundle::new(&ctx, Dialect::Sycl, "int main() {}");
    h.compiler.build(&sycl, ctx.devices(), &options).unwrap_err();
    assert!(sink.contents().starts_with("error: sycl is not supported on "));
}

#[test]
fn warnings_reach_the_log_of_a_successful_build() {
    let h = Harness::new(None);
    let ctx = host_context();
    let source = format!("#pragma kiln_unknown\n{INCREMENT}");
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, source);
    let sink = LogSink::new();

    let built = h
        .compiler
        .build(&bundle, ctx.devices(), &CompileOptions::new().with_log(sink.clone()))
        .unwrap();
    assert!(built.has_entry("increment_kernel"));
    assert!(sink.contents().contains("warning: unknown pragma ignored"), "{}", sink.contents());

    let strict = CompileOptions::new().flag("-Werror").with_log(sink.clone());
    assert!(h.compiler.build(&bundle, ctx.devices(), &strict).is_err());
    assert!(sink.contents().contains("error: unknown pragma ignored"));
}

#[test]
fn unknown_flag_is_a_compile_error() {
    let h = Harness::new(None);
    let ctx = host_context();
    let bundle = SourceBundle::new(&ctx, Dialect::OpenCl, INCREMENT);
    let sink = LogSink::new();

    let options = CompileOptions::new().flag("-fno-such-flag").with_log(sink.clone());
    let err = h.compiler.build(&bundle, ctx.devices(), &options).unwrap_err();
    assert_eq!(err.to_string(), "compilation failed: unknown argument: '-fno-such-flag'");
    assert!(sink.contents().contains("'-fno-such-flag'"));
}
