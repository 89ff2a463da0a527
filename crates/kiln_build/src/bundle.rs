//! Compiled, loaded kernel bundles and their kernels.

use std::fmt;
use std::sync::{Arc, OnceLock};

use kiln_common::Fingerprint;
use kiln_runtime::{Context, Device, LoadedImage};
use kiln_spirv::ArgType;
use serde::Serialize;

use crate::error::BuildError;
use crate::registry::{reflect, EntryPoint};

/// Where a bundle's payload came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Loaded from the persistent cache without compiling.
    Cache,
    /// Produced by a compiler backend during this build.
    Compiled,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Cache => f.write_str("cache"),
            Origin::Compiled => f.write_str("compiled"),
        }
    }
}

/// A binary loaded onto a set of devices, with its named kernels.
///
/// Valid only for the context and devices it was built for. The entry point
/// index is computed from the payload on first query and never changes.
#[derive(Debug)]
pub struct ExecutableBundle {
    context: Context,
    image: LoadedImage,
    payload: Arc<[u8]>,
    fingerprint: Fingerprint,
    origin: Origin,
    entries: OnceLock<Vec<EntryPoint>>,
}

impl ExecutableBundle {
    pub(crate) fn new(
        context: Context,
        image: LoadedImage,
        payload: Vec<u8>,
        fingerprint: Fingerprint,
        origin: Origin,
    ) -> Self {
        Self {
            context,
            image,
            payload: Arc::from(payload),
            fingerprint,
            origin,
            entries: OnceLock::new(),
        }
    }

    /// The owning context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Devices the binary is loaded onto.
    pub fn devices(&self) -> &[Device] {
        &self.image.devices
    }

    /// The binary payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The cache key of the build that produced this bundle.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Whether the payload came from the cache.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Every entry point, in declaration order.
    pub fn entry_points(&self) -> &[EntryPoint] {
        self.entries.get_or_init(|| reflect(&self.payload))
    }

    /// Returns `true` if the bundle has a kernel named `name`.
    pub fn has_entry(&self, name: &str) -> bool {
        self.entry_points().iter().any(|e| e.name == name)
    }

    /// Returns the entry point named `name`.
    pub fn get_entry(&self, name: &str) -> Result<&EntryPoint, BuildError> {
        self.entry_points()
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BuildError::NotFound(name.to_string()))
    }

    /// Returns a handle to the kernel named `name`.
    pub fn kernel(&self, name: &str) -> Result<Kernel<'_>, BuildError> {
        let entry = self.get_entry(name)?;
        Ok(Kernel {
            bundle: self,
            entry,
        })
    }
}

/// A kernel of a loaded bundle.
#[derive(Clone, Copy, Debug)]
pub struct Kernel<'a> {
    bundle: &'a ExecutableBundle,
    entry: &'a EntryPoint,
}

impl<'a> Kernel<'a> {
    /// Kernel function name.
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    /// Number of arguments the kernel takes.
    pub fn num_args(&self) -> usize {
        self.entry.arg_count
    }

    /// Argument types, in declaration order.
    pub fn arg_types(&self) -> &'a [ArgType] {
        &self.entry.arg_types
    }
}
