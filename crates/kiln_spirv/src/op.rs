//! Opcode and enumerant values from the SPIR-V specification.

#![allow(missing_docs)]

/// Module magic number, in native word order.
pub const MAGIC: u32 = 0x0723_0203;

/// SPIR-V 1.0, the version emitted by [`ModuleWriter`](crate::ModuleWriter).
pub const VERSION_1_0: u32 = 0x0001_0000;

/// Number of words in the module header.
pub const HEADER_WORDS: usize = 5;

pub const OP_SOURCE: u16 = 3;
pub const OP_NAME: u16 = 5;
pub const OP_MEMORY_MODEL: u16 = 14;
pub const OP_ENTRY_POINT: u16 = 15;
pub const OP_CAPABILITY: u16 = 17;
pub const OP_TYPE_VOID: u16 = 19;
pub const OP_TYPE_BOOL: u16 = 20;
pub const OP_TYPE_INT: u16 = 21;
pub const OP_TYPE_FLOAT: u16 = 22;
pub const OP_TYPE_VECTOR: u16 = 23;
pub const OP_TYPE_IMAGE: u16 = 25;
pub const OP_TYPE_SAMPLER: u16 = 26;
pub const OP_TYPE_ARRAY: u16 = 28;
pub const OP_TYPE_STRUCT: u16 = 30;
pub const OP_TYPE_OPAQUE: u16 = 31;
pub const OP_TYPE_POINTER: u16 = 32;
pub const OP_TYPE_FUNCTION: u16 = 33;
pub const OP_TYPE_EVENT: u16 = 34;
pub const OP_FUNCTION: u16 = 54;
pub const OP_FUNCTION_PARAMETER: u16 = 55;
pub const OP_FUNCTION_END: u16 = 56;
pub const OP_LABEL: u16 = 248;
pub const OP_RETURN: u16 = 253;
pub const OP_MODULE_PROCESSED: u16 = 330;

/// `ExecutionModel::Kernel`.
pub const EXECUTION_MODEL_KERNEL: u32 = 6;

/// `AddressingModel::Physical64`.
pub const ADDRESSING_PHYSICAL64: u32 = 2;

/// `MemoryModel::OpenCL`.
pub const MEMORY_MODEL_OPENCL: u32 = 2;

/// `SourceLanguage::OpenCL_C`.
pub const SOURCE_LANGUAGE_OPENCL_C: u32 = 3;

pub const CAPABILITY_ADDRESSES: u32 = 4;
pub const CAPABILITY_KERNEL: u32 = 6;
pub const CAPABILITY_VECTOR16: u32 = 7;
pub const CAPABILITY_FLOAT16: u32 = 9;
pub const CAPABILITY_FLOAT64: u32 = 10;
pub const CAPABILITY_INT64: u32 = 11;
pub const CAPABILITY_INT16: u32 = 22;
pub const CAPABILITY_INT8: u32 = 39;

pub const STORAGE_UNIFORM_CONSTANT: u32 = 0;
pub const STORAGE_WORKGROUP: u32 = 4;
pub const STORAGE_CROSS_WORKGROUP: u32 = 5;
pub const STORAGE_PRIVATE: u32 = 6;
pub const STORAGE_FUNCTION: u32 = 7;
pub const STORAGE_GENERIC: u32 = 8;
