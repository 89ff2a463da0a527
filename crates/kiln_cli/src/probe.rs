//! `kiln probe`: report devices and the dialects they can build.

use std::sync::Arc;

use kiln_backend::BackendSet;
use kiln_common::Dialect;
use kiln_runtime::{Context, Device, HostRuntime};
use serde::Serialize;

use crate::settings::resolve_config;
use crate::{GlobalArgs, ProbeArgs, ReportFormat};

#[derive(Serialize)]
struct ProbeReport {
    devices: Vec<DeviceReport>,
    backends: Vec<BackendReport>,
}

#[derive(Serialize)]
struct DeviceReport {
    device: String,
    backend: String,
    driver_version: String,
    vendor: String,
    dialects: Vec<DialectSupport>,
}

#[derive(Serialize)]
struct DialectSupport {
    dialect: Dialect,
    supported: bool,
    compiler: Option<String>,
}

#[derive(Serialize)]
struct BackendReport {
    name: String,
    available: bool,
}

/// Runs the `kiln probe` command. Always returns exit code 0.
pub fn run(args: &ProbeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let backends = BackendSet::from_config(&config.compiler);
    let context = Context::with_all_devices(Arc::new(HostRuntime::new()));
    let dialects: Vec<Dialect> = match args.lang {
        Some(lang) => vec![lang.into()],
        None => Dialect::ALL.to_vec(),
    };

    let report = probe(&context, &backends, &dialects);
    match args.format {
        ReportFormat::Text => print_text(&report),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

fn probe(context: &Context, backends: &BackendSet, dialects: &[Dialect]) -> ProbeReport {
    let devices = context
        .devices()
        .iter()
        .map(|device| DeviceReport {
            device: device.target.device.clone(),
            backend: device.target.backend.clone(),
            driver_version: device.target.driver_version.clone(),
            vendor: device.vendor.clone(),
            dialects: dialects
                .iter()
                .map(|&dialect| support(context, backends, device, dialect))
                .collect(),
        })
        .collect();
    let backends = backends
        .backends()
        .iter()
        .map(|b| BackendReport {
            name: b.name().to_string(),
            available: b.is_available(),
        })
        .collect();
    ProbeReport { devices, backends }
}

fn support(context: &Context, backends: &BackendSet, device: &Device, dialect: Dialect) -> DialectSupport {
    let compiler = backends
        .select(dialect, &device.target)
        .map(|b| b.name().to_string());
    DialectSupport {
        dialect,
        supported: compiler.is_some() && context.supports_dialect(device, dialect),
        compiler,
    }
}

fn print_text(report: &ProbeReport) {
    for device in &report.devices {
        println!(
            "{} ({}, driver {}, {})",
            device.device, device.backend, device.driver_version, device.vendor
        );
        for d in &device.dialects {
            match (&d.compiler, d.supported) {
                (Some(compiler), true) => println!("  {:<8} yes  ({compiler})", d.dialect.name()),
                _ => println!("  {:<8} no", d.dialect.name()),
            }
        }
    }
    let backends: Vec<String> = report
        .backends
        .iter()
        .map(|b| {
            let state = if b.available { "available" } else { "unavailable" };
            format!("{} ({state})", b.name)
        })
        .collect();
    println!("backends: {}", backends.join(", "));
}
