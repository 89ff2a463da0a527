//! SPIR-V module reflection.
//!
//! Only the parts of a module that describe its kernel interface are decoded:
//! entry points, the types of their function parameters, and the
//! `OpModuleProcessed` record. Every other instruction is skipped after its
//! length has been validated.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SpirvError;
use crate::op;
use crate::types::{AddressSpace, ArgType};

/// Type nesting deeper than this is treated as malformed.
const MAX_TYPE_DEPTH: usize = 32;

/// A kernel entry point and its parameter list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointInfo {
    /// Entry point name.
    pub name: String,
    /// Parameter types, in declaration order.
    pub params: Vec<ArgType>,
}

/// The reflected kernel interface of a module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpirvModule {
    /// SPIR-V version as `(major, minor)`.
    pub version: (u8, u8),
    /// Kernel entry points in module order.
    pub entry_points: Vec<EntryPointInfo>,
    /// `OpModuleProcessed` strings in module order.
    pub processed: Vec<String>,
}

impl SpirvModule {
    /// Finds an entry point by name.
    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInfo> {
        self.entry_points.iter().find(|e| e.name == name)
    }
}

/// Raw type declaration, before resolving operand ids.
enum RawType {
    Void,
    Bool,
    Int(u32),
    Float(u32),
    Vector(u32, u32),
    Pointer(u32, u32),
    Named(String),
}

/// Parses the kernel interface of a SPIR-V module.
///
/// Both byte orders are accepted. Entry points with an execution model other
/// than `Kernel` are ignored.
pub fn parse(bytes: &[u8]) -> Result<SpirvModule, SpirvError> {
    let words = to_words(bytes)?;
    let version = words[1];
    let version = (((version >> 16) & 0xff) as u8, ((version >> 8) & 0xff) as u8);

    let mut types: HashMap<u32, RawType> = HashMap::new();
    let mut functions: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut entries: Vec<(u32, String)> = Vec::new();
    let mut processed = Vec::new();
    let mut current_fn: Option<u32> = None;

    let mut offset = op::HEADER_WORDS;
    while offset < words.len() {
        let first = words[offset];
        let count = (first >> 16) as usize;
        let opcode = (first & 0xffff) as u16;
        if count == 0 {
            return Err(SpirvError::ZeroWordCount(offset));
        }
        if offset + count > words.len() {
            return Err(SpirvError::Truncated(offset));
        }
        let operands = &words[offset + 1..offset + count];
        let need = |n: usize| {
            if operands.len() < n {
                Err(SpirvError::Malformed { opcode, offset })
            } else {
                Ok(())
            }
        };

        match opcode {
            op::OP_ENTRY_POINT => {
                need(3)?;
                if operands[0] == op::EXECUTION_MODEL_KERNEL {
                    let name = decode_string(&operands[2..], offset)?;
                    entries.push((operands[1], name));
                }
            }
            op::OP_MODULE_PROCESSED => {
                need(1)?;
                processed.push(decode_string(operands, offset)?);
            }
            op::OP_TYPE_VOID => {
                need(1)?;
                types.insert(operands[0], RawType::Void);
            }
            op::OP_TYPE_BOOL => {
                need(1)?;
                types.insert(operands[0], RawType::Bool);
            }
            op::OP_TYPE_INT => {
                need(2)?;
                types.insert(operands[0], RawType::Int(operands[1]));
            }
            op::OP_TYPE_FLOAT => {
                need(2)?;
                types.insert(operands[0], RawType::Float(operands[1]));
            }
            op::OP_TYPE_VECTOR => {
                need(3)?;
                types.insert(operands[0], RawType::Vector(operands[1], operands[2]));
            }
            op::OP_TYPE_POINTER => {
                need(3)?;
                types.insert(operands[0], RawType::Pointer(operands[1], operands[2]));
            }
            op::OP_TYPE_OPAQUE => {
                need(2)?;
                let name = decode_string(&operands[1..], offset)?;
                types.insert(operands[0], RawType::Named(name));
            }
            op::OP_TYPE_IMAGE => {
                need(1)?;
                types.insert(operands[0], RawType::Named("image".to_string()));
            }
            op::OP_TYPE_SAMPLER => {
                need(1)?;
                types.insert(operands[0], RawType::Named("sampler_t".to_string()));
            }
            op::OP_TYPE_EVENT => {
                need(1)?;
                types.insert(operands[0], RawType::Named("event_t".to_string()));
            }
            op::OP_TYPE_ARRAY | op::OP_TYPE_STRUCT => {
                need(1)?;
                types.insert(operands[0], RawType::Named("struct".to_string()));
            }
            op::OP_FUNCTION => {
                need(4)?;
                functions.insert(operands[1], Vec::new());
                current_fn = Some(operands[1]);
            }
            op::OP_FUNCTION_PARAMETER => {
                need(2)?;
                let Some(fn_id) = current_fn else {
                    return Err(SpirvError::Malformed { opcode, offset });
                };
                if let Some(params) = functions.get_mut(&fn_id) {
                    params.push(operands[0]);
                }
            }
            op::OP_FUNCTION_END => current_fn = None,
            _ => {}
        }
        offset += count;
    }

    let mut seen = HashSet::new();
    let mut entry_points = Vec::with_capacity(entries.len());
    for (fn_id, name) in entries {
        if !seen.insert(name.clone()) {
            return Err(SpirvError::DuplicateEntryPoint(name));
        }
        let Some(param_ids) = functions.get(&fn_id) else {
            return Err(SpirvError::UndefinedFunction(name));
        };
        let params = param_ids
            .iter()
            .map(|id| resolve(&types, *id, 0))
            .collect::<Result<Vec<_>, _>>()?;
        entry_points.push(EntryPointInfo { name, params });
    }

    Ok(SpirvModule {
        version,
        entry_points,
        processed,
    })
}

/// Returns `true` if `bytes` starts with the SPIR-V magic number in either byte order.
pub fn looks_like_spirv(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && {
        let le = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        le == op::MAGIC || le.swap_bytes() == op::MAGIC
    }
}

fn to_words(bytes: &[u8]) -> Result<Vec<u32>, SpirvError> {
    if bytes.len() < op::HEADER_WORDS * 4 {
        return Err(SpirvError::TooShort(bytes.len()));
    }
    if bytes.len() % 4 != 0 {
        return Err(SpirvError::Misaligned(bytes.len()));
    }
    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words[0] != op::MAGIC {
        if words[0].swap_bytes() != op::MAGIC {
            return Err(SpirvError::BadMagic(words[0]));
        }
        for w in &mut words {
            *w = w.swap_bytes();
        }
    }
    Ok(words)
}

/// Decodes a NUL-terminated literal string starting at `operands[0]`.
fn decode_string(operands: &[u32], offset: usize) -> Result<String, SpirvError> {
    let mut bytes = Vec::new();
    for word in operands {
        for b in word.to_le_bytes() {
            if b == 0 {
                return String::from_utf8(bytes).map_err(|_| SpirvError::BadString(offset));
            }
            bytes.push(b);
        }
    }
    Err(SpirvError::BadString(offset))
}

fn resolve(types: &HashMap<u32, RawType>, id: u32, depth: usize) -> Result<ArgType, SpirvError> {
    if depth > MAX_TYPE_DEPTH {
        return Err(SpirvError::UndefinedType(id));
    }
    let raw = types.get(&id).ok_or(SpirvError::UndefinedType(id))?;
    Ok(match raw {
        RawType::Void => ArgType::Void,
        RawType::Bool => ArgType::Bool,
        RawType::Int(width) => ArgType::Int { width: *width },
        RawType::Float(width) => ArgType::Float { width: *width },
        RawType::Vector(element, count) => ArgType::Vector {
            element: Box::new(resolve(types, *element, depth + 1)?),
            count: *count,
        },
        RawType::Pointer(class, pointee) => ArgType::Pointer {
            space: AddressSpace::from_storage_class(*class).unwrap_or(AddressSpace::Generic),
            pointee: Box::new(resolve(types, *pointee, depth + 1)?),
        },
        RawType::Named(name) => ArgType::Opaque(name.clone()),
    })
}
