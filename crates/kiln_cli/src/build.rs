//! `kiln build`: compile one kernel source file.

use std::path::Path;
use std::sync::Arc;

use kiln_build::{BuildError, CompileOptions, EntryPoint, ExecutableBundle, KernelCompiler, SourceBundle};
use kiln_cache::TraceOutput;
use kiln_common::Dialect;
use kiln_diagnostics::LogSink;
use kiln_runtime::{Context, HostRuntime};
use serde::Serialize;

use crate::settings::resolve_config;
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Machine-readable build result.
#[derive(Serialize)]
struct BuildReport<'a> {
    file: &'a str,
    dialect: Dialect,
    success: bool,
    fingerprint: Option<String>,
    origin: Option<String>,
    payload_bytes: Option<usize>,
    kernels: Vec<EntryPoint>,
    error: Option<String>,
    log: String,
}

/// Runs the `kiln build` command.
///
/// Returns exit code 0 on success, 1 if the source failed to compile, and 2
/// if no device can build the dialect.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let path = Path::new(&args.file);
    let source = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let dialect = args.lang.map(Dialect::from).unwrap_or_else(|| infer_dialect(path, &source));

    let compiler = KernelCompiler::from_config(&config, TraceOutput::Stderr);
    let context = Context::with_all_devices(Arc::new(HostRuntime::new()));
    let bundle = SourceBundle::new(&context, dialect, source);
    let sink = LogSink::new();
    let options = CompileOptions::new()
        .flags(args.flags.iter().cloned())
        .with_log(sink.clone());

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("   Compiling {} ({dialect})", args.file);
    }
    let result = compiler.build(&bundle, context.devices(), &options);
    let log = sink.contents();

    if let Ok(ref executable) = result {
        if let Some(ref out) = args.output {
            std::fs::write(out, executable.payload())
                .map_err(|e| format!("cannot write {out}: {e}"))?;
        }
    }

    match args.format {
        ReportFormat::Text => report_text(args, global, &result, &log),
        ReportFormat::Json => report_json(args, dialect, &result, log)?,
    }

    Ok(match result {
        Ok(_) => 0,
        Err(ref e) if e.is_unsupported() => 2,
        Err(_) => 1,
    })
}

/// `.spv` files are SPIR-V; everything else is OpenCL C.
/// Picks a dialect from the file extension, then from the content.
fn infer_dialect(path: &Path, source: &[u8]) -> Dialect {
    match path.extension().and_then(|e| e.to_str()) {
        Some("spv") => Dialect::Spirv,
        _ if kiln_spirv::looks_like_spirv(source) => Dialect::Spirv,
        _ => Dialect::OpenCl,
    }
}

fn report_text(
    args: &BuildArgs,
    global: &GlobalArgs,
    result: &Result<ExecutableBundle, BuildError>,
    log: &str,
) {
    match result {
        Ok(executable) => {
            eprint!("{log}");
            if global.quiet {
                return;
            }
            eprintln!(
                "    Finished {} ({}, {} bytes)",
                args.file,
                executable.origin(),
                executable.payload().len()
            );
            if global.verbose {
                eprintln!(" Fingerprint {}", executable.fingerprint());
            }
            for entry in executable.entry_points() {
                println!("{}", signature(entry));
            }
        }
        Err(e) => {
            if let Some(build_log) = e.build_log() {
                eprint!("{build_log}");
            }
            eprintln!("error: {e}");
        }
    }
}

fn report_json(
    args: &BuildArgs,
    dialect: Dialect,
    result: &Result<ExecutableBundle, BuildError>,
    log: String,
) -> Result<(), serde_json::Error> {
    let report = match result {
        Ok(executable) => BuildReport {
            file: &args.file,
            dialect,
            success: true,
            fingerprint: Some(executable.fingerprint().to_string()),
            origin: Some(executable.origin().to_string()),
            payload_bytes: Some(executable.payload().len()),
            kernels: executable.entry_points().to_vec(),
            error: None,
            log,
        },
        Err(e) => BuildReport {
            file: &args.file,
            dialect,
            success: false,
            fingerprint: None,
            origin: None,
            payload_bytes: None,
            kernels: Vec::new(),
            error: Some(e.to_string()),
            log,
        },
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Renders an entry point as a C-like signature, e.g. `k(__global int*, uint)`.
fn signature(entry: &EntryPoint) -> String {
    let args: Vec<String> = entry.arg_types.iter().map(|t| t.to_string()).collect();
    format!("{}({})", entry.name, args.join(", "))
}
