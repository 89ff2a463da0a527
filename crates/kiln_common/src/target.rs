//! Identity of a compilation target.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend name of runtimes that consume SPIR-V through the OpenCL API.
pub const OPENCL_BACKEND: &str = "opencl";

/// Backend name of runtimes that consume SPIR-V through Level Zero.
pub const LEVEL_ZERO_BACKEND: &str = "level_zero";

/// Describes the device and driver a binary is built for.
///
/// Two targets that compare equal must accept each other's binaries; any
/// field that can change the generated code belongs here. Ordering is
/// lexicographic by field so target sets can be sorted deterministically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct TargetId {
    /// Runtime backend, e.g. `opencl`.
    pub backend: String,
    /// Device name as reported by the driver.
    pub device: String,
    /// Driver version string.
    pub driver_version: String,
}

impl TargetId {
    /// Creates a target identity.
    pub fn new(
        backend: impl Into<String>,
        device: impl Into<String>,
        driver_version: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            device: device.into(),
            driver_version: driver_version.into(),
        }
    }

    /// Returns `true` if the target's backend loads SPIR-V modules.
    pub fn consumes_spirv(&self) -> bool {
        matches!(self.backend.as_str(), OPENCL_BACKEND | LEVEL_ZERO_BACKEND)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.backend, self.device, self.driver_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let t = TargetId::new("opencl", "kiln host cpu", "0.1.0");
        assert_eq!(t.to_string(), "opencl:kiln host cpu (0.1.0)");
    }

    #[test]
    fn spirv_consumers() {
        assert!(TargetId::new(OPENCL_BACKEND, "gpu", "1").consumes_spirv());
        assert!(TargetId::new(LEVEL_ZERO_BACKEND, "gpu", "1").consumes_spirv());
        assert!(!TargetId::new("cuda", "gpu", "1").consumes_spirv());
    }

    #[test]
    fn ordering_is_by_backend_then_device() {
        let mut targets = vec![
            TargetId::new("opencl", "b", "1"),
            TargetId::new("level_zero", "z", "1"),
            TargetId::new("opencl", "a", "2"),
        ];
        targets.sort();
        let devices: Vec<&str> = targets.iter().map(|t| t.device.as_str()).collect();
        assert_eq!(devices, ["z", "a", "b"]);
    }
}
