//! Writer for interface-only SPIR-V kernel modules.
//!
//! The module declares every kernel as an entry point with its full parameter
//! list and an empty body. Everything a loader or the entry point registry
//! inspects is present; the code itself is the backend's business.

use std::collections::{BTreeSet, HashMap};

use crate::op;
use crate::types::ArgType;

/// One kernel to declare in the module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelInterface {
    /// Entry point name.
    pub name: String,
    /// Parameter names, parallel to `params`. Used for debug names only.
    pub param_names: Vec<String>,
    /// Parameter types.
    pub params: Vec<ArgType>,
}

/// Builds a SPIR-V module from kernel interfaces.
pub struct ModuleWriter {
    source_version: u32,
    processed: Vec<String>,
    kernels: Vec<KernelInterface>,
}

impl ModuleWriter {
    /// Creates a writer for OpenCL C source of the given version (`120`, `200`, `300`).
    ///
    /// `OpSource` encodes version `M.m` as `M * 100000 + m * 1000`.
    pub fn new(opencl_c_version: u32) -> Self {
        let major = opencl_c_version / 100;
        let minor = opencl_c_version % 100 / 10;
        Self {
            source_version: major * 100_000 + minor * 1000,
            processed: Vec::new(),
            kernels: Vec::new(),
        }
    }

    /// Records a processing step (a compile flag) in the module.
    pub fn processed(&mut self, step: impl Into<String>) -> &mut Self {
        self.processed.push(step.into());
        self
    }

    /// Declares a kernel.
    pub fn kernel(&mut self, kernel: KernelInterface) -> &mut Self {
        self.kernels.push(kernel);
        self
    }

    /// Encodes the module as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_words()
            .into_iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    /// Encodes the module as words in logical layout order.
    pub fn to_words(&self) -> Vec<u32> {
        let mut ids = IdAllocator::default();

        // Function ids come first so entry points can name them.
        let fn_ids: Vec<u32> = self.kernels.iter().map(|_| ids.next()).collect();

        let mut types = TypeSection::default();
        let void_id = types.intern(&ArgType::Void, &mut ids);
        let mut fn_type_ids = Vec::with_capacity(self.kernels.len());
        let mut param_type_ids = Vec::with_capacity(self.kernels.len());
        for kernel in &self.kernels {
            let param_ids: Vec<u32> = kernel.params.iter().map(|p| types.intern(p, &mut ids)).collect();
            fn_type_ids.push(types.function(void_id, &param_ids, &mut ids));
            param_type_ids.push(param_ids);
        }

        let mut capabilities = BTreeSet::from([op::CAPABILITY_ADDRESSES, op::CAPABILITY_KERNEL]);
        capabilities.extend(types.capabilities.iter().copied());

        let mut preamble = Vec::new();
        for cap in &capabilities {
            inst(&mut preamble, op::OP_CAPABILITY, &[*cap]);
        }
        inst(
            &mut preamble,
            op::OP_MEMORY_MODEL,
            &[op::ADDRESSING_PHYSICAL64, op::MEMORY_MODEL_OPENCL],
        );
        for (kernel, fn_id) in self.kernels.iter().zip(&fn_ids) {
            let mut operands = vec![op::EXECUTION_MODEL_KERNEL, *fn_id];
            operands.extend(encode_string(&kernel.name));
            inst(&mut preamble, op::OP_ENTRY_POINT, &operands);
        }
        inst(
            &mut preamble,
            op::OP_SOURCE,
            &[op::SOURCE_LANGUAGE_OPENCL_C, self.source_version],
        );
        for (kernel, fn_id) in self.kernels.iter().zip(&fn_ids) {
            let mut operands = vec![*fn_id];
            operands.extend(encode_string(&kernel.name));
            inst(&mut preamble, op::OP_NAME, &operands);
        }
        for step in &self.processed {
            inst(&mut preamble, op::OP_MODULE_PROCESSED, &encode_string(step));
        }

        let mut functions = Vec::new();
        for i in 0..self.kernels.len() {
            inst(
                &mut functions,
                op::OP_FUNCTION,
                &[void_id, fn_ids[i], 0, fn_type_ids[i]],
            );
            for ty in &param_type_ids[i] {
                let param_id = ids.next();
                inst(&mut functions, op::OP_FUNCTION_PARAMETER, &[*ty, param_id]);
            }
            let label = ids.next();
            inst(&mut functions, op::OP_LABEL, &[label]);
            inst(&mut functions, op::OP_RETURN, &[]);
            inst(&mut functions, op::OP_FUNCTION_END, &[]);
        }

        let mut words = vec![op::MAGIC, op::VERSION_1_0, 0, ids.bound(), 0];
        words.extend(preamble);
        words.extend(types.words);
        words.extend(functions);
        words
    }
}

#[derive(Default)]
struct IdAllocator {
    last: u32,
}

impl IdAllocator {
    fn next(&mut self) -> u32 {
        self.last += 1;
        self.last
    }

    fn bound(&self) -> u32 {
        self.last + 1
    }
}

#[derive(Default)]
struct TypeSection {
    words: Vec<u32>,
    ids: HashMap<ArgType, u32>,
    fn_ids: HashMap<Vec<u32>, u32>,
    capabilities: BTreeSet<u32>,
}

impl TypeSection {
    /// Returns the id of `ty`, declaring it and its components on first use.
    fn intern(&mut self, ty: &ArgType, ids: &mut IdAllocator) -> u32 {
        if let Some(&id) = self.ids.get(ty) {
            return id;
        }
        let id = match ty {
            ArgType::Void => {
                let id = ids.next();
                inst(&mut self.words, op::OP_TYPE_VOID, &[id]);
                id
            }
            ArgType::Bool => {
                let id = ids.next();
                inst(&mut self.words, op::OP_TYPE_BOOL, &[id]);
                id
            }
            ArgType::Int { width } => {
                match width {
                    8 => self.capabilities.insert(op::CAPABILITY_INT8),
                    16 => self.capabilities.insert(op::CAPABILITY_INT16),
                    64 => self.capabilities.insert(op::CAPABILITY_INT64),
                    _ => false,
                };
                let id = ids.next();
                // OpenCL SPIR-V integers are always signedness 0.
                inst(&mut self.words, op::OP_TYPE_INT, &[id, *width, 0]);
                id
            }
            ArgType::Float { width } => {
                match width {
                    16 => self.capabilities.insert(op::CAPABILITY_FLOAT16),
                    64 => self.capabilities.insert(op::CAPABILITY_FLOAT64),
                    _ => false,
                };
                let id = ids.next();
                inst(&mut self.words, op::OP_TYPE_FLOAT, &[id, *width]);
                id
            }
            ArgType::Vector { element, count } => {
                if *count > 4 {
                    self.capabilities.insert(op::CAPABILITY_VECTOR16);
                }
                let element_id = self.intern(element, ids);
                let id = ids.next();
                inst(&mut self.words, op::OP_TYPE_VECTOR, &[id, element_id, *count]);
                id
            }
            ArgType::Pointer { space, pointee } => {
                let pointee_id = self.intern(pointee, ids);
                let id = ids.next();
                inst(
                    &mut self.words,
                    op::OP_TYPE_POINTER,
                    &[id, space.storage_class(), pointee_id],
                );
                id
            }
            ArgType::Opaque(name) => {
                let id = ids.next();
                let mut operands = vec![id];
                operands.extend(encode_string(name));
                inst(&mut self.words, op::OP_TYPE_OPAQUE, &operands);
                id
            }
        };
        self.ids.insert(ty.clone(), id);
        id
    }

    fn function(&mut self, ret: u32, params: &[u32], ids: &mut IdAllocator) -> u32 {
        let mut key = vec![ret];
        key.extend_from_slice(params);
        if let Some(&id) = self.fn_ids.get(&key) {
            return id;
        }
        let id = ids.next();
        let mut operands = vec![id];
        operands.extend_from_slice(&key);
        inst(&mut self.words, op::OP_TYPE_FUNCTION, &operands);
        self.fn_ids.insert(key, id);
        id
    }
}

fn inst(out: &mut Vec<u32>, opcode: u16, operands: &[u32]) {
    let word_count = (operands.len() + 1) as u32;
    out.push((word_count << 16) | u32::from(opcode));
    out.extend_from_slice(operands);
}

/// Encodes a literal string: UTF-8, NUL-terminated, zero-padded to a word.
pub(crate) fn encode_string(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
