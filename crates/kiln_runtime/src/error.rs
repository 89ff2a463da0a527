//! Errors raised when a runtime loads a binary.

use kiln_common::TargetId;
use kiln_spirv::SpirvError;

/// A runtime could not load a payload onto its devices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The payload is not a well-formed module.
    #[error("invalid binary: {0}")]
    InvalidBinary(#[from] SpirvError),

    /// The module targets a newer SPIR-V version than the device accepts.
    #[error("SPIR-V {found_major}.{found_minor} is not supported by {target} (maximum {max_major}.{max_minor})")]
    UnsupportedVersion {
        /// Device that rejected the module.
        target: TargetId,
        /// Module major version.
        found_major: u8,
        /// Module minor version.
        found_minor: u8,
        /// Highest major version the device accepts.
        max_major: u8,
        /// Highest minor version the device accepts.
        max_minor: u8,
    },

    /// A device in the load request does not belong to this runtime.
    #[error("device '{0}' is not managed by this runtime")]
    UnknownDevice(TargetId),

    /// The load request named no devices.
    #[error("no devices to load onto")]
    NoDevices,
}
