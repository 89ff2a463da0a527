//! Device runtimes: the devices binaries are built for, and the loader that
//! accepts those binaries.
//!
//! The build pipeline consumes two things from a runtime: the capability
//! query [`DeviceRuntime::target_supports_dialect`] and the binary loader
//! [`DeviceRuntime::load_executable`]. [`HostRuntime`] is the reference
//! implementation over emulated host devices.

#![warn(missing_docs)]

pub mod device;
pub mod error;
pub mod host;
pub mod runtime;

pub use device::{Context, Device};
pub use error::LoadError;
pub use host::{HostRuntime, HOST_DEVICE_NAME};
pub use runtime::{DeviceRuntime, LoadedImage};
