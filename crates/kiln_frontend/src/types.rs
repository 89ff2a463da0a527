//! Classification of OpenCL C type words and qualifiers.

use kiln_spirv::{AddressSpace, ArgType};

const VECTOR_WIDTHS: [u32; 5] = [2, 3, 4, 8, 16];

const OPAQUE_TYPES: [&str; 10] = [
    "image1d_t",
    "image1d_array_t",
    "image1d_buffer_t",
    "image2d_t",
    "image2d_array_t",
    "image2d_depth_t",
    "image3d_t",
    "sampler_t",
    "event_t",
    "queue_t",
];

/// Returns the scalar type named by `word`, if any.
pub fn scalar(word: &str) -> Option<ArgType> {
    let ty = match word {
        "void" => ArgType::Void,
        "bool" => ArgType::Bool,
        "char" | "uchar" => ArgType::Int { width: 8 },
        "short" | "ushort" => ArgType::Int { width: 16 },
        "int" | "uint" | "signed" | "unsigned" => ArgType::int(),
        "long" | "ulong" | "size_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t" => ArgType::Int { width: 64 },
        "half" => ArgType::Float { width: 16 },
        "float" => ArgType::float(),
        "double" => ArgType::Float { width: 64 },
        _ => return None,
    };
    Some(ty)
}

/// Returns the built-in type named by `word`: scalar, vector, or opaque.
pub fn builtin_type(word: &str) -> Option<ArgType> {
    if let Some(ty) = scalar(word) {
        return Some(ty);
    }
    if OPAQUE_TYPES.contains(&word) {
        return Some(ArgType::Opaque(word.to_string()));
    }
    let split = word.find(|c: char| c.is_ascii_digit())?;
    let (base, count) = word.split_at(split);
    let count: u32 = count.parse().ok()?;
    if !VECTOR_WIDTHS.contains(&count) {
        return None;
    }
    match scalar(base)? {
        ArgType::Void | ArgType::Bool => None,
        _ if matches!(base, "signed" | "unsigned" | "size_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t") => None,
        element => Some(ArgType::Vector {
            element: Box::new(element),
            count,
        }),
    }
}

/// Returns the address space named by a qualifier word.
pub fn address_space(word: &str) -> Option<AddressSpace> {
    match word {
        "__global" | "global" => Some(AddressSpace::Global),
        "__constant" | "constant" => Some(AddressSpace::Constant),
        "__local" | "local" => Some(AddressSpace::Local),
        "__private" | "private" => Some(AddressSpace::Private),
        "__generic" | "generic" => Some(AddressSpace::Generic),
        _ => None,
    }
}

/// Returns `true` for qualifiers and storage classes that do not change the reflected type.
pub fn is_plain_qualifier(word: &str) -> bool {
    matches!(
        word,
        "const"
            | "volatile"
            | "restrict"
            | "__restrict"
            | "static"
            | "inline"
            | "extern"
            | "__read_only"
            | "read_only"
            | "__write_only"
            | "write_only"
            | "__read_write"
            | "read_write"
    )
}

/// Returns `true` if `word` can begin or continue a type specifier.
pub fn is_type_word(word: &str) -> bool {
    builtin_type(word).is_some()
        || address_space(word).is_some()
        || is_plain_qualifier(word)
        || matches!(word, "struct" | "union" | "enum")
}

/// Combines the base type words of one declaration into a type.
///
/// Sign words are dropped; among the remaining words a width word
/// (`char`, `short`, `long`) wins over `int`, so `unsigned long int` is a
/// 64-bit integer.
pub fn combine(words: &[&str]) -> Option<ArgType> {
    let significant: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !matches!(*w, "signed" | "unsigned"))
        .collect();
    if significant.is_empty() {
        return words.first().and_then(|w| scalar(w));
    }
    let chosen = significant
        .iter()
        .find(|w| matches!(**w, "char" | "short" | "long"))
        .unwrap_or(&significant[0]);
    builtin_type(chosen)
}

/// Wraps `base` in `depth` levels of pointer.
///
/// `space` applies to the innermost pointee; outer levels point into private
/// memory. A `void` pointee reflects as `char`.
pub fn pointer_to(base: ArgType, depth: usize, space: AddressSpace) -> ArgType {
    if depth == 0 {
        return base;
    }
    let pointee = match base {
        ArgType::Void => ArgType::Int { width: 8 },
        other => other,
    };
    let mut ty = ArgType::pointer(space, pointee);
    for _ in 1..depth {
        ty = ArgType::pointer(AddressSpace::Private, ty);
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_vectors() {
        assert_eq!(builtin_type("uint"), Some(ArgType::int()));
        assert_eq!(builtin_type("size_t"), Some(ArgType::Int { width: 64 }));
        assert_eq!(
            builtin_type("float4"),
            Some(ArgType::Vector {
                element: Box::new(ArgType::float()),
                count: 4
            })
        );
        assert_eq!(builtin_type("uchar16").map(|t| t.to_string()), Some("char16".to_string()));
        assert_eq!(builtin_type("float5"), None);
        assert_eq!(builtin_type("bool2"), None);
        assert_eq!(builtin_type("image2d_t"), Some(ArgType::Opaque("image2d_t".to_string())));
        assert_eq!(builtin_type("data"), None);
    }

    #[test]
    fn combined_words() {
        assert_eq!(combine(&["unsigned", "long", "int"]), Some(ArgType::Int { width: 64 }));
        assert_eq!(combine(&["unsigned"]), Some(ArgType::int()));
        assert_eq!(combine(&["unsigned", "char"]), Some(ArgType::Int { width: 8 }));
        assert_eq!(combine(&["float"]), Some(ArgType::float()));
        assert_eq!(combine(&[]), None);
    }

    #[test]
    fn qualifiers() {
        assert_eq!(address_space("__global"), Some(AddressSpace::Global));
        assert_eq!(address_space("local"), Some(AddressSpace::Local));
        assert!(is_type_word("const"));
        assert!(is_type_word("int"));
        assert!(!is_type_word("get_global_id"));
    }

    #[test]
    fn pointers() {
        assert_eq!(
            pointer_to(ArgType::Void, 1, AddressSpace::Global).to_string(),
            "__global char*"
        );
        assert_eq!(pointer_to(ArgType::int(), 0, AddressSpace::Global), ArgType::int());
        assert_eq!(
            pointer_to(ArgType::float(), 2, AddressSpace::Global).to_string(),
            "__global float**"
        );
    }
}
