//! The device runtime interface the build pipeline consumes.

use kiln_common::{Dialect, TargetId};

use crate::device::Device;
use crate::error::LoadError;

/// A payload accepted by a runtime for a set of devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    /// Runtime-assigned handle.
    pub handle: u64,
    /// Devices the image was loaded onto.
    pub devices: Vec<Device>,
}

/// A driver stack that owns devices and loads binaries onto them.
pub trait DeviceRuntime: Send + Sync {
    /// Stable runtime name, e.g. `host`.
    fn name(&self) -> &str;

    /// Every device this runtime exposes.
    fn devices(&self) -> Vec<Device>;

    /// Returns `true` if the driver for `target` accepts programs written in `dialect`.
    fn target_supports_dialect(&self, target: &TargetId, dialect: Dialect) -> bool;

    /// Loads `payload` onto `devices`.
    ///
    /// Implementations must reject payloads they cannot execute rather than
    /// fail later, so that a corrupt cached binary is detected here.
    fn load_executable(&self, devices: &[Device], payload: &[u8]) -> Result<LoadedImage, LoadError>;
}
