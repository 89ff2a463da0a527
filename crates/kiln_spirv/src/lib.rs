//! Minimal SPIR-V support for kernel interfaces.
//!
//! Compiled kernel bundles are SPIR-V modules. This crate reads the parts of a
//! module the entry point registry needs (kernel entry points and their
//! parameter types) and writes interface modules for the in-process front end.
//! It is not a general SPIR-V toolkit: instructions outside that scope are
//! skipped on read and never produced on write.

#![warn(missing_docs)]

pub mod error;
pub mod op;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::SpirvError;
pub use reader::{looks_like_spirv, parse, EntryPointInfo, SpirvModule};
pub use types::{AddressSpace, ArgType};
pub use writer::{KernelInterface, ModuleWriter};
