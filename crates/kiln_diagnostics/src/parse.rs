//! Recovery of structured diagnostics from clang-style toolchain output.
//!
//! External compilers report problems as text lines of the form
//! `<file>:<line>:<col>: <severity>: <message>`, interleaved with source
//! excerpts and caret markers. Only the headline lines carry meaning for
//! callers; excerpt lines are skipped.

use crate::diagnostic::{Diagnostic, Location};
use crate::severity::Severity;

/// Severity words in the order they are tried. `fatal error` must precede `error`.
const SEVERITY_WORDS: [&str; 5] = ["fatal error", "error", "warning", "note", "remark"];

/// Parses every diagnostic headline in `output`.
///
/// Lines that are not headlines (source excerpts, carets, summaries) are
/// ignored. The raw text remains the authoritative build log; this is a
/// best-effort structured view of it.
pub fn parse_toolchain_output(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Diagnostic> {
    for word in SEVERITY_WORDS {
        // Headline without a location prefix, e.g. `error: unknown argument`.
        if let Some(message) = line
            .strip_prefix(word)
            .and_then(|rest| rest.strip_prefix(": "))
        {
            return Some(make(word, message, None));
        }

        let marker = format!(": {word}: ");
        if let Some(idx) = line.find(&marker) {
            let prefix = &line[..idx];
            let message = &line[idx + marker.len()..];
            return Some(make(word, message, parse_location(prefix)));
        }
    }
    None
}

fn make(word: &str, message: &str, location: Option<Location>) -> Diagnostic {
    Diagnostic {
        severity: Severity::from_word(word).unwrap_or(Severity::Error),
        message: message.trim_end().to_string(),
        location,
        notes: Vec::new(),
    }
}

/// Extracts `line:col` from the tail of a `<file>:<line>:<col>` prefix.
fn parse_location(prefix: &str) -> Option<Location> {
    let mut parts = prefix.rsplit(':');
    let column = parts.next()?.trim().parse().ok()?;
    let line = parts.next()?.trim().parse().ok()?;
    Some(Location::new(line, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLANG_LOG: &str = "\
1:3:34: error: use of undeclared identifier 'no'
  size_t i = get_global_id(0) +  no semi-colon!!
                                 ^
1:3:36: error: expected ';' at end of declaration
  size_t i = get_global_id(0) +  no semi-colon!!
                                   ^
                                   ;

Build failed with error code: -11
";

    #[test]
    fn parses_clang_headlines() {
        let diags = parse_toolchain_output(CLANG_LOG);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "use of undeclared identifier 'no'");
        assert_eq!(diags[0].location, Some(Location::new(3, 34)));
        assert_eq!(diags[1].message, "expected ';' at end of declaration");
        assert_eq!(diags[1].location, Some(Location::new(3, 36)));
        assert!(diags.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn parses_named_file_prefix() {
        let diags = parse_toolchain_output("/tmp/kernel-1a2b.cl:12:5: warning: unused variable 'x'");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].location, Some(Location::new(12, 5)));
    }

    #[test]
    fn parses_locationless_error() {
        let diags = parse_toolchain_output("error: unknown argument: '-cl-bogus'");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location, None);
        assert_eq!(diags[0].message, "unknown argument: '-cl-bogus'");
    }

    #[test]
    fn fatal_error_is_not_plain_error() {
        let diags = parse_toolchain_output("k.cl:1:10: fatal error: 'missing.h' file not found");
        assert_eq!(diags[0].severity, Severity::Fatal);
        assert_eq!(diags[0].message, "'missing.h' file not found");
    }

    #[test]
    fn non_numeric_prefix_has_no_location() {
        let diags = parse_toolchain_output("clang: error: no input files");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location, None);
    }

    #[test]
    fn empty_output_has_no_diagnostics() {
        assert!(parse_toolchain_output("").is_empty());
    }
}
