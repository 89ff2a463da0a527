//! A reference runtime whose devices live in the host process.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use kiln_common::{Dialect, TargetId, OPENCL_BACKEND};

use crate::device::Device;
use crate::error::LoadError;
use crate::runtime::{DeviceRuntime, LoadedImage};

/// Name of the default host device.
pub const HOST_DEVICE_NAME: &str = "kiln host cpu";

/// Highest SPIR-V version host devices accept.
const MAX_SPIRV_VERSION: (u8, u8) = (1, 2);

/// A runtime over emulated host devices.
///
/// Loading validates the payload as a SPIR-V module and checks its version,
/// which is everything a driver would do before building device code. It is
/// the runtime the CLI and the test suites run against.
#[derive(Debug)]
pub struct HostRuntime {
    devices: Vec<Device>,
    dialects: Vec<Dialect>,
    next_handle: AtomicU64,
    loads: AtomicUsize,
}

impl HostRuntime {
    /// Creates a runtime with the single default host device.
    pub fn new() -> Self {
        let target = TargetId::new(OPENCL_BACKEND, HOST_DEVICE_NAME, env!("CARGO_PKG_VERSION"));
        Self::with_devices(vec![Device::new(target, "kiln")])
    }

    /// Creates a runtime over the given devices.
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices,
            dialects: vec![Dialect::OpenCl, Dialect::Spirv],
            next_handle: AtomicU64::new(1),
            loads: AtomicUsize::new(0),
        }
    }

    /// Restricts the dialects the devices' driver accepts.
    pub fn with_dialects(mut self, dialects: &[Dialect]) -> Self {
        self.dialects = dialects.to_vec();
        self
    }

    /// Number of successful loads so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn owns(&self, target: &TargetId) -> bool {
        self.devices.iter().any(|d| &d.target == target)
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRuntime for HostRuntime {
    fn name(&self) -> &str {
        "host"
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.clone()
    }

    fn target_supports_dialect(&self, target: &TargetId, dialect: Dialect) -> bool {
        self.owns(target) && self.dialects.contains(&dialect)
    }

    fn load_executable(&self, devices: &[Device], payload: &[u8]) -> Result<LoadedImage, LoadError> {
        if devices.is_empty() {
            return Err(LoadError::NoDevices);
        }
        if let Some(foreign) = devices.iter().find(|d| !self.owns(&d.target)) {
            return Err(LoadError::UnknownDevice(foreign.target.clone()));
        }

        let module = kiln_spirv::parse(payload)?;
        if module.version > MAX_SPIRV_VERSION {
            return Err(LoadError::UnsupportedVersion {
                target: devices[0].target.clone(),
                found_major: module.version.0,
                found_minor: module.version.1,
                max_major: MAX_SPIRV_VERSION.0,
                max_minor: MAX_SPIRV_VERSION.1,
            });
        }

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.loads.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "loaded image {handle} ({} bytes, {} kernel(s)) onto {} device(s)",
            payload.len(),
            module.entry_points.len(),
            devices.len()
        );
        Ok(LoadedImage {
            handle,
            devices: devices.to_vec(),
        })
    }
}
