//! In-process front end for OpenCL C kernel source.
//!
//! The front end checks a translation unit the way a device compiler's first
//! stage would and extracts the signature of every `__kernel` function. It is
//! deliberately shallow: it performs no macro expansion and no type checking
//! of expressions, and it never generates code. What it does report follows
//! clang's wording and positions so build logs read the same whichever
//! backend produced them.
//!
//! # Pipeline
//!
//! 1. [`lexer::lex`] splits source into tokens and preprocessor directives.
//! 2. Directives declare macros, pull declarations from `#include`d headers,
//!    and surface `#error`/`#warning` and unknown pragmas.
//! 3. [`parser::parse_program`] collects top-level declarations and kernel
//!    signatures.
//! 4. [`check::check_body`] checks each function body.

#![warn(missing_docs)]

pub mod builtins;
pub mod check;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_diagnostics::{Diagnostic, Severity};
use kiln_spirv::KernelInterface;

use crate::check::Env;
use crate::lexer::Directive;

/// Maximum `#include` nesting depth.
const MAX_INCLUDE_DEPTH: usize = 32;

/// Options that change what the front end accepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontendOptions {
    /// Macro names predefined on the command line (`-D`).
    pub defines: Vec<String>,
    /// Directories searched for `#include` (`-I`), in order.
    pub include_dirs: Vec<PathBuf>,
    /// Drop all warnings (`-w`).
    pub suppress_warnings: bool,
    /// Report warnings as errors (`-Werror`).
    pub warnings_as_errors: bool,
}

/// Outcome of analyzing one translation unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translation {
    /// Kernel interfaces of every defined `__kernel` function, in source order.
    pub kernels: Vec<KernelInterface>,
    /// Diagnostics in the order they were produced.
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    /// Returns `true` if any diagnostic fails the build.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Returns the number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Analyzes an OpenCL C translation unit.
pub fn analyze(source: &str, options: &FrontendOptions) -> Translation {
    let lexed = lexer::lex(source);
    let mut diagnostics = lexed.diagnostics;

    let mut env = Env::default();
    env.macros.extend(options.defines.iter().cloned());
    let mut included = HashSet::new();
    process_directives(&lexed.directives, options, &mut env, &mut diagnostics, &mut included, 0);

    let program = parser::parse_program(source, &lexed.tokens, &env.typedefs, &mut diagnostics);
    env.functions.extend(program.functions.iter().map(|f| f.name.clone()));
    env.globals.extend(program.globals.iter().cloned());
    env.typedefs.extend(program.typedefs.iter().cloned());

    for function in &program.functions {
        if let Some((start, end)) = function.body {
            check::check_body(
                source,
                &lexed.tokens[start..end],
                lexed.tokens[end],
                &function.params,
                &env,
                &mut diagnostics,
            );
        }
    }

    apply_warning_policy(&mut diagnostics, options);

    let kernels: Vec<KernelInterface> = program
        .functions
        .into_iter()
        .filter(|f| f.is_kernel && f.body.is_some())
        .map(|f| KernelInterface {
            name: f.name,
            param_names: f.params.iter().map(|p| p.name.clone()).collect(),
            params: f.params.into_iter().map(|p| p.ty).collect(),
        })
        .collect();

    log::debug!(
        "front end: {} kernel(s), {} diagnostic(s)",
        kernels.len(),
        diagnostics.len()
    );
    Translation {
        kernels,
        diagnostics,
    }
}

fn apply_warning_policy(diagnostics: &mut Vec<Diagnostic>, options: &FrontendOptions) {
    if options.suppress_warnings {
        diagnostics.retain(|d| d.severity != Severity::Warning);
    } else if options.warnings_as_errors {
        for d in diagnostics.iter_mut().filter(|d| d.severity == Severity::Warning) {
            d.severity = Severity::Error;
        }
    }
}

fn process_directives(
    directives: &[Directive],
    options: &FrontendOptions,
    env: &mut Env,
    diagnostics: &mut Vec<Diagnostic>,
    included: &mut HashSet<PathBuf>,
    depth: usize,
) {
    for d in directives {
        let at = Some(d.location);
        match d.name.as_str() {
            "define" => match d.defined_name() {
                Some(name) => {
                    env.macros.insert(name.to_string());
                }
                None => diagnostics.push(Diagnostic::error("macro name missing", at)),
            },
            "include" => include(d, options, env, diagnostics, included, depth),
            "pragma" => {
                let first = d.body.split_whitespace().next().unwrap_or("");
                if !matches!(first, "OPENCL" | "unroll" | "nounroll" | "once" | "clang" | "STDC") {
                    diagnostics.push(Diagnostic::warning("unknown pragma ignored", at));
                }
            }
            "error" => diagnostics.push(Diagnostic::error(d.body.clone(), at)),
            "warning" => diagnostics.push(Diagnostic::warning(d.body.clone(), at)),
            "" | "undef" | "if" | "ifdef" | "ifndef" | "elif" | "else" | "endif" | "line" => {}
            _ => diagnostics.push(Diagnostic::error("invalid preprocessing directive", at)),
        }
    }
}

/// Declares the macros, functions, globals, and typedefs of an included header.
///
/// Problems inside the header itself are not reported; only a missing or
/// unreadable header is.
fn include(
    directive: &Directive,
    options: &FrontendOptions,
    env: &mut Env,
    diagnostics: &mut Vec<Diagnostic>,
    included: &mut HashSet<PathBuf>,
    depth: usize,
) {
    let at = Some(directive.location);
    let body = directive.body.as_str();
    let name = body
        .strip_prefix('"')
        .and_then(|b| b.split('"').next())
        .or_else(|| body.strip_prefix('<').and_then(|b| b.split('>').next()));
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        diagnostics.push(Diagnostic::error(
            "expected \"FILENAME\" or <FILENAME>",
            at,
        ));
        return;
    };
    if depth >= MAX_INCLUDE_DEPTH {
        diagnostics.push(Diagnostic::error("#include nested too deeply", at));
        return;
    }
    let Some(path) = find_header(name, &options.include_dirs) else {
        diagnostics.push(Diagnostic::error(format!("'{name}' file not found"), at));
        return;
    };
    if !included.insert(path.clone()) {
        return;
    }
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                format!("cannot open file '{}': {e}", path.display()),
                at,
            ));
            return;
        }
    };

    log::debug!("including {}", path.display());
    let lexed = lexer::lex(&text);
    let mut header_diagnostics = Vec::new();
    process_directives(&lexed.directives, options, env, &mut header_diagnostics, included, depth + 1);
    let program = parser::parse_program(&text, &lexed.tokens, &env.typedefs, &mut header_diagnostics);
    env.functions.extend(program.functions.into_iter().map(|f| f.name));
    env.globals.extend(program.globals);
    env.typedefs.extend(program.typedefs);
    // Nested missing headers are still fatal.
    diagnostics.extend(
        header_diagnostics
            .into_iter()
            .filter(|d| d.is_error() && d.message.ends_with("file not found")),
    );
}

fn find_header(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    dirs.iter().map(|d| d.join(name)).find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_diagnostics::{render_all, Location};
    use kiln_spirv::{AddressSpace, ArgType};

    const INCREMENT: &str = r#"
#define INC1(x) ((x) = (x) + 1);

#define INC10(x)                                                               \
  INC1(x)                                                                      \
  INC1(x)                                                                      \
  INC1(x)

// OpenCL Kernel
__kernel void increment_kernel(__global int* data) {
    int gid = get_global_id(0);
    int value = data[gid];

    INC10(value);
    data[gid] = value;

}
"#;

    const BAD: &str = r#"
__kernel void my_kernel(__global int *in, __global int *out) {
  size_t i = get_global_id(0) +  no semi-colon!!
  out[i] = in[i]*2 + 100;
}
"#;

    #[test]
    fn increment_kernel_has_one_global_int_pointer() {
        let t = analyze(INCREMENT, &FrontendOptions::default());
        assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
        assert_eq!(t.kernels.len(), 1);
        let k = &t.kernels[0];
        assert_eq!(k.name, "increment_kernel");
        assert_eq!(k.param_names, vec!["data".to_string()]);
        assert_eq!(k.params, vec![ArgType::pointer(AddressSpace::Global, ArgType::int())]);
    }

    #[test]
    fn bad_source_matches_clang_log() {
        let t = analyze(BAD, &FrontendOptions::default());
        assert!(t.has_errors());
        assert_eq!(t.error_count(), 2);
        let log = render_all(&t.diagnostics, "1", BAD);
        let expected = "\
1:3:34: error: use of undeclared identifier 'no'
  size_t i = get_global_id(0) +  no semi-colon!!
                                 ^
1:3:36: error: expected ';' at end of declaration
  size_t i = get_global_id(0) +  no semi-colon!!
                                   ^
                                   ;
";
        assert_eq!(log, expected);
    }

    #[test]
    fn command_line_defines_declare_names() {
        let source = "__kernel void k(__global float* a) { a[0] = SCALE; }";
        assert!(analyze(source, &FrontendOptions::default()).has_errors());
        let options = FrontendOptions {
            defines: vec!["SCALE".to_string()],
            ..FrontendOptions::default()
        };
        assert!(!analyze(source, &options).has_errors());
    }

    #[test]
    fn unknown_pragma_warning_policy() {
        let source = "#pragma frobnicate\n__kernel void k() {}\n";
        let plain = analyze(source, &FrontendOptions::default());
        assert_eq!(plain.diagnostics.len(), 1);
        assert_eq!(plain.diagnostics[0].severity, Severity::Warning);
        assert!(!plain.has_errors());

        let strict = analyze(
            source,
            &FrontendOptions {
                warnings_as_errors: true,
                ..FrontendOptions::default()
            },
        );
        assert!(strict.has_errors());

        let quiet = analyze(
            source,
            &FrontendOptions {
                suppress_warnings: true,
                ..FrontendOptions::default()
            },
        );
        assert!(quiet.diagnostics.is_empty());
    }

    #[test]
    fn error_directive() {
        let t = analyze("#error unsupported device\n", &FrontendOptions::default());
        assert_eq!(t.diagnostics[0].message, "unsupported device");
        assert_eq!(t.diagnostics[0].location, Some(Location::new(1, 1)));
    }

    #[test]
    fn known_pragmas_are_quiet() {
        let t = analyze(
            "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n__kernel void k(__global double* d) {}\n",
            &FrontendOptions::default(),
        );
        assert!(t.diagnostics.is_empty());
        assert_eq!(t.kernels[0].params[0].to_string(), "__global double*");
    }

    #[test]
    fn missing_include() {
        let t = analyze("#include \"helpers.h\"\n", &FrontendOptions::default());
        assert_eq!(t.diagnostics[0].message, "'helpers.h' file not found");
    }

    #[test]
    fn include_declares_header_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("helpers.h"),
            "#define WIDTH 16\ntypedef float real;\nreal twice(real x) { return x * 2; }\n",
        )
        .unwrap();
        let source = "#include \"helpers.h\"\n\
                      __kernel void k(__global real* a) { a[0] = twice(a[WIDTH]); }\n";
        let options = FrontendOptions {
            include_dirs: vec![dir.path().to_path_buf()],
            ..FrontendOptions::default()
        };
        let t = analyze(source, &options);
        assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
        assert_eq!(t.kernels[0].params[0].to_string(), "__global real*");
    }

    #[test]
    fn prototype_kernels_are_not_entry_points() {
        let t = analyze(
            "__kernel void later(__global int* a);\n__kernel void now(__global int* a) {}\n",
            &FrontendOptions::default(),
        );
        let names: Vec<&str> = t.kernels.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["now"]);
    }
}
