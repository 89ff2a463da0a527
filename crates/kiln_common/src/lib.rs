//! Shared foundational types used across the kiln kernel compiler.
//!
//! This crate provides the content fingerprint used as the persistent cache key,
//! the source dialect enumeration, and the target identity shared by every
//! stage of the build.

#![warn(missing_docs)]

pub mod dialect;
pub mod fingerprint;
pub mod target;

pub use dialect::{Dialect, ParseDialectError};
pub use fingerprint::{Fingerprint, FingerprintHasher, ParseFingerprintError};
pub use target::{TargetId, LEVEL_ZERO_BACKEND, OPENCL_BACKEND};
