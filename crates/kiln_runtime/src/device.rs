//! Devices and the contexts that group them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kiln_common::{Dialect, TargetId};
use serde::{Deserialize, Serialize};

use crate::runtime::DeviceRuntime;

/// A device exposed by a runtime.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Device {
    /// Identity used for target matching and fingerprinting.
    pub target: TargetId,
    /// Vendor name as reported by the driver.
    pub vendor: String,
}

impl Device {
    /// Creates a device.
    pub fn new(target: TargetId, vendor: impl Into<String>) -> Self {
        Self {
            target,
            vendor: vendor.into(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.target, self.vendor)
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

struct ContextInner {
    id: u64,
    runtime: Arc<dyn DeviceRuntime>,
    devices: Vec<Device>,
}

/// A set of devices from one runtime that share binaries.
///
/// Cloning is cheap and yields the same context; two separately created
/// contexts are never equal, even over the same devices.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Creates a context over the given devices of `runtime`.
    pub fn new(runtime: Arc<dyn DeviceRuntime>, devices: Vec<Device>) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("created context {id} with {} device(s)", devices.len());
        Self {
            inner: Arc::new(ContextInner {
                id,
                runtime,
                devices,
            }),
        }
    }

    /// Creates a context over every device of `runtime`.
    pub fn with_all_devices(runtime: Arc<dyn DeviceRuntime>) -> Self {
        let devices = runtime.devices();
        Self::new(runtime, devices)
    }

    /// Process-unique identifier of this context.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The runtime that owns the devices.
    pub fn runtime(&self) -> &Arc<dyn DeviceRuntime> {
        &self.inner.runtime
    }

    /// Devices in this context, in creation order.
    pub fn devices(&self) -> &[Device] {
        &self.inner.devices
    }

    /// Returns `true` if `device` belongs to this context.
    pub fn contains(&self, device: &Device) -> bool {
        self.inner.devices.contains(device)
    }

    /// Capability query for one device of this context.
    pub fn supports_dialect(&self, device: &Device, dialect: Dialect) -> bool {
        self.inner.runtime.target_supports_dialect(&device.target, dialect)
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("runtime", &self.inner.runtime.name())
            .field("devices", &self.inner.devices)
            .finish()
    }
}
