//! Kernel argument types as seen through a SPIR-V module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::op;

/// OpenCL address spaces and their SPIR-V storage classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AddressSpace {
    /// `__private`, storage class `Function`.
    Private,
    /// `__global`, storage class `CrossWorkgroup`.
    Global,
    /// `__constant`, storage class `UniformConstant`.
    Constant,
    /// `__local`, storage class `Workgroup`.
    Local,
    /// The unnamed generic address space.
    Generic,
}

impl AddressSpace {
    /// Returns the SPIR-V storage class.
    pub fn storage_class(self) -> u32 {
        match self {
            AddressSpace::Private => op::STORAGE_FUNCTION,
            AddressSpace::Global => op::STORAGE_CROSS_WORKGROUP,
            AddressSpace::Constant => op::STORAGE_UNIFORM_CONSTANT,
            AddressSpace::Local => op::STORAGE_WORKGROUP,
            AddressSpace::Generic => op::STORAGE_GENERIC,
        }
    }

    /// Maps a storage class back to an address space.
    pub fn from_storage_class(class: u32) -> Option<Self> {
        match class {
            op::STORAGE_FUNCTION | op::STORAGE_PRIVATE => Some(AddressSpace::Private),
            op::STORAGE_CROSS_WORKGROUP => Some(AddressSpace::Global),
            op::STORAGE_UNIFORM_CONSTANT => Some(AddressSpace::Constant),
            op::STORAGE_WORKGROUP => Some(AddressSpace::Local),
            op::STORAGE_GENERIC => Some(AddressSpace::Generic),
            _ => None,
        }
    }

    /// The OpenCL C qualifier spelling; empty for private and generic.
    pub fn qualifier(self) -> &'static str {
        match self {
            AddressSpace::Private | AddressSpace::Generic => "",
            AddressSpace::Global => "__global",
            AddressSpace::Constant => "__constant",
            AddressSpace::Local => "__local",
        }
    }
}

/// The type of one kernel parameter.
///
/// OpenCL SPIR-V does not record integer signedness, so `int` and `uint`
/// parameters reflect identically.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ArgType {
    /// `void`, only valid as a pointee.
    Void,
    /// `bool`.
    Bool,
    /// Integer of the given bit width.
    Int {
        /// Width in bits: 8, 16, 32, or 64.
        width: u32,
    },
    /// Floating point of the given bit width.
    Float {
        /// Width in bits: 16, 32, or 64.
        width: u32,
    },
    /// Vector of scalars, e.g. `float4`.
    Vector {
        /// Component type.
        element: Box<ArgType>,
        /// Component count.
        count: u32,
    },
    /// Pointer into an address space.
    Pointer {
        /// Address space of the pointee.
        space: AddressSpace,
        /// Pointee type.
        pointee: Box<ArgType>,
    },
    /// Any type the registry does not model further (images, samplers, structs).
    Opaque(String),
}

impl ArgType {
    /// Shorthand for a 32-bit integer.
    pub fn int() -> Self {
        ArgType::Int { width: 32 }
    }

    /// Shorthand for a 32-bit float.
    pub fn float() -> Self {
        ArgType::Float { width: 32 }
    }

    /// Shorthand for a pointer to `pointee` in `space`.
    pub fn pointer(space: AddressSpace, pointee: ArgType) -> Self {
        ArgType::Pointer {
            space,
            pointee: Box::new(pointee),
        }
    }

    /// Returns `true` for pointer types.
    pub fn is_pointer(&self) -> bool {
        matches!(self, ArgType::Pointer { .. })
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Void => write!(f, "void"),
            ArgType::Bool => write!(f, "bool"),
            ArgType::Int { width } => match width {
                8 => write!(f, "char"),
                16 => write!(f, "short"),
                32 => write!(f, "int"),
                64 => write!(f, "long"),
                w => write!(f, "i{w}"),
            },
            ArgType::Float { width } => match width {
                16 => write!(f, "half"),
                32 => write!(f, "float"),
                64 => write!(f, "double"),
                w => write!(f, "f{w}"),
            },
            ArgType::Vector { element, count } => write!(f, "{element}{count}"),
            ArgType::Pointer { space, pointee } => {
                let q = space.qualifier();
                if q.is_empty() {
                    write!(f, "{pointee}*")
                } else {
                    write!(f, "{q} {pointee}*")
                }
            }
            ArgType::Opaque(name) => write!(f, "{name}"),
        }
    }
}
