//! Reflection of kernel entry points from a compiled payload.

use kiln_spirv::ArgType;
use serde::{Deserialize, Serialize};

/// A named kernel in an executable bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Kernel function name.
    pub name: String,
    /// Number of kernel arguments.
    pub arg_count: usize,
    /// Argument types, in declaration order.
    pub arg_types: Vec<ArgType>,
}

/// Reads the kernel entry points declared in a SPIR-V payload.
///
/// A payload that cannot be reflected declares no entry points; the runtime
/// loader has already accepted it by the time this runs.
pub fn reflect(payload: &[u8]) -> Vec<EntryPoint> {
    match kiln_spirv::parse(payload) {
        Ok(module) => module
            .entry_points
            .into_iter()
            .map(|e| EntryPoint {
                name: e.name,
                arg_count: e.params.len(),
                arg_types: e.params,
            })
            .collect(),
        Err(e) => {
            log::warn!("cannot reflect entry points: {e}");
            Vec::new()
        }
    }
}
