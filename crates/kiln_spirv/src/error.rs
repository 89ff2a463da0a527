//! Error types for SPIR-V reading.

/// Reasons a byte sequence is not a usable SPIR-V kernel module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpirvError {
    /// Fewer bytes than a module header.
    #[error("module too short: {0} bytes")]
    TooShort(usize),

    /// Length is not a whole number of 32-bit words.
    #[error("module length {0} is not a multiple of 4")]
    Misaligned(usize),

    /// The first word is not the SPIR-V magic number in either byte order.
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    /// An instruction declares a word count of zero.
    #[error("zero word count at word {0}")]
    ZeroWordCount(usize),

    /// An instruction runs past the end of the module.
    #[error("instruction at word {0} runs past end of module")]
    Truncated(usize),

    /// An instruction is shorter than its opcode requires.
    #[error("malformed opcode {opcode} at word {offset}")]
    Malformed {
        /// The opcode.
        opcode: u16,
        /// Word offset of the instruction.
        offset: usize,
    },

    /// A literal string is not NUL-terminated or not UTF-8.
    #[error("bad literal string at word {0}")]
    BadString(usize),

    /// An entry point names a function the module does not define.
    #[error("entry point '{0}' refers to an undefined function")]
    UndefinedFunction(String),

    /// A parameter refers to a type id the module does not declare.
    #[error("undefined type id %{0}")]
    UndefinedType(u32),

    /// Two kernel entry points share a name.
    #[error("duplicate entry point '{0}'")]
    DuplicateEntryPoint(String),
}
