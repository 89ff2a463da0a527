//! Names declared by the OpenCL C environment.

const FUNCTIONS: &[&str] = &[
    // Work-item functions.
    "get_work_dim",
    "get_global_size",
    "get_global_id",
    "get_local_size",
    "get_enqueued_local_size",
    "get_local_id",
    "get_num_groups",
    "get_group_id",
    "get_global_offset",
    "get_global_linear_id",
    "get_local_linear_id",
    // Synchronization.
    "barrier",
    "work_group_barrier",
    "mem_fence",
    "read_mem_fence",
    "write_mem_fence",
    // Math.
    "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "cbrt", "ceil", "copysign",
    "cos", "cosh", "erf", "erfc", "exp", "exp2", "exp10", "expm1", "fabs", "fdim", "floor",
    "fma", "fmax", "fmin", "fmod", "fract", "frexp", "hypot", "ilogb", "ldexp", "lgamma", "log",
    "log2", "log10", "log1p", "logb", "mad", "modf", "nextafter", "pow", "pown", "powr",
    "remainder", "rint", "rootn", "round", "rsqrt", "sin", "sincos", "sinh", "sqrt", "tan",
    "tanh", "tgamma", "trunc",
    // Integer.
    "abs", "abs_diff", "add_sat", "hadd", "rhadd", "clamp", "clz", "ctz", "mad_hi", "mad_sat",
    "max", "min", "mul_hi", "rotate", "sub_sat", "upsample", "popcount", "mad24", "mul24",
    // Common and geometric.
    "degrees", "mix", "radians", "step", "smoothstep", "sign", "cross", "dot", "distance",
    "length", "normalize",
    // Relational.
    "isequal", "isnotequal", "isgreater", "isgreaterequal", "isless", "islessequal",
    "islessgreater", "isfinite", "isinf", "isnan", "isnormal", "isordered", "isunordered",
    "signbit", "any", "all", "bitselect", "select",
    // Miscellaneous.
    "shuffle", "shuffle2", "printf", "async_work_group_copy", "async_work_group_strided_copy",
    "wait_group_events", "prefetch",
    // Images.
    "read_imagef", "read_imagei", "read_imageui", "write_imagef", "write_imagei",
    "write_imageui", "get_image_width", "get_image_height", "get_image_depth",
    "get_image_dim", "get_image_channel_data_type", "get_image_channel_order",
];

const CONSTANTS: &[&str] = &[
    "true", "false", "NULL", "MAXFLOAT", "HUGE_VALF", "HUGE_VAL", "INFINITY", "NAN",
    "__OPENCL_VERSION__", "__OPENCL_C_VERSION__", "CL_VERSION_1_2", "CL_VERSION_2_0",
    "__LINE__", "__FILE__",
];

/// Families of builtins declared for every suffix, e.g. `convert_float4_rte`.
const PREFIXES: &[&str] = &[
    "convert_", "as_", "atomic_", "atom_", "native_", "half_", "vload", "vstore", "work_group_",
    "sub_group_", "get_sub_group_", "CLK_", "M_", "FLT_", "DBL_", "HALF_", "CHAR_", "SCHAR_",
    "UCHAR_", "SHRT_", "USHRT_", "INT_", "UINT_", "LONG_", "ULONG_", "memory_order_",
    "memory_scope_",
];

/// Returns `true` if `name` is declared by the OpenCL C environment.
pub fn is_builtin(name: &str) -> bool {
    FUNCTIONS.contains(&name)
        || CONSTANTS.contains(&name)
        || PREFIXES.iter().any(|p| name.starts_with(p) && name.len() > p.len())
}

/// Returns `true` for statement keywords, which are never identifiers.
pub fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "if" | "else"
            | "for"
            | "while"
            | "do"
            | "switch"
            | "case"
            | "default"
            | "return"
            | "break"
            | "continue"
            | "goto"
            | "sizeof"
            | "typedef"
            | "__attribute__"
    )
}
