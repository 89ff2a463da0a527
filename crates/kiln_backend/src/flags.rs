//! Build flag parsing for the in-process front end.

use crate::error::CompileError;
use kiln_frontend::FrontendOptions;
use std::path::PathBuf;

/// OpenCL C version assumed when no `-cl-std` flag is given.
pub const DEFAULT_CL_VERSION: u32 = 120;

const MATH_FLAGS: [&str; 8] = [
    "-cl-fast-relaxed-math",
    "-cl-finite-math-only",
    "-cl-mad-enable",
    "-cl-opt-disable",
    "-cl-denorms-are-zero",
    "-cl-no-signed-zeros",
    "-cl-unsafe-math-optimizations",
    "-cl-single-precision-constant",
];

/// Flags after parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFlags {
    /// OpenCL C version as `major * 100 + minor * 10`.
    pub cl_version: u32,
    /// Options forwarded to the front end.
    pub frontend: FrontendOptions,
    /// Accepted flags in normalized spelling, in caller order.
    pub processed: Vec<String>,
}

/// Parses build flags, rejecting anything the front end does not understand.
pub fn parse_flags(options: &[String]) -> Result<ParsedFlags, CompileError> {
    let mut parsed = ParsedFlags {
        cl_version: DEFAULT_CL_VERSION,
        frontend: FrontendOptions::default(),
        processed: Vec::new(),
    };

    let mut iter = options.iter();
    while let Some(flag) = iter.next() {
        let flag = flag.as_str();
        if let Some(std) = flag.strip_prefix("-cl-std=") {
            parsed.cl_version = match std {
                "CL1.2" => 120,
                "CL2.0" => 200,
                "CL3.0" => 300,
                _ => {
                    return Err(CompileError::message(format!(
                        "invalid value '{std}' in '{flag}'"
                    )))
                }
            };
            parsed.processed.push(flag.to_string());
        } else if MATH_FLAGS.contains(&flag) {
            parsed.processed.push(flag.to_string());
        } else if flag == "-w" {
            parsed.frontend.suppress_warnings = true;
            parsed.processed.push(flag.to_string());
        } else if flag == "-Werror" {
            parsed.frontend.warnings_as_errors = true;
            parsed.processed.push(flag.to_string());
        } else if let Some(rest) = flag.strip_prefix("-D") {
            let define = joined_value(rest, "-D", &mut iter)?;
            parsed.processed.push(format!("-D{define}"));
            parsed.frontend.defines.push(define);
        } else if let Some(rest) = flag.strip_prefix("-I") {
            let dir = joined_value(rest, "-I", &mut iter)?;
            parsed.processed.push(format!("-I{dir}"));
            parsed.frontend.include_dirs.push(PathBuf::from(dir));
        } else if flag.is_empty() {
            continue;
        } else {
            return Err(CompileError::message(format!("unknown argument: '{flag}'")));
        }
    }
    Ok(parsed)
}

/// Returns the value of a flag written either as `-Xvalue` or `-X value`.
fn joined_value<'a>(
    rest: &str,
    flag: &str,
    iter: &mut impl Iterator<Item = &'a String>,
) -> Result<String, CompileError> {
    if !rest.is_empty() {
        return Ok(rest.to_string());
    }
    match iter.next() {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(CompileError::message(format!(
            "argument to '{flag}' is missing (expected 1 value)"
        ))),
    }
}
