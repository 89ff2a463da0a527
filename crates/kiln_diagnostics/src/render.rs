//! Clang-style text rendering of diagnostics against their source.

use crate::diagnostic::Diagnostic;

/// Renders one diagnostic as a headline, the offending source line, and a caret.
///
/// `file` is the prefix printed before the location; toolchains that compile
/// from an in-memory buffer conventionally use the buffer index `1`.
pub fn render(diag: &Diagnostic, file: &str, source: &str) -> String {
    let mut out = String::new();
    match diag.location {
        Some(loc) => out.push_str(&format!("{file}:{loc}: {}: {}\n", diag.severity, diag.message)),
        None => out.push_str(&format!("{}: {}\n", diag.severity, diag.message)),
    }

    if let Some(loc) = diag.location {
        if let Some(text) = source.lines().nth(loc.line.saturating_sub(1) as usize) {
            out.push_str(text);
            out.push('\n');
            let pad = loc.column.saturating_sub(1) as usize;
            out.push_str(&" ".repeat(pad));
            out.push_str("^\n");
        }
    }

    for note in &diag.notes {
        out.push_str(&" ".repeat(diag.location.map_or(0, |l| l.column.saturating_sub(1) as usize)));
        out.push_str(note);
        out.push('\n');
    }
    out
}

/// Renders every diagnostic in order, concatenated.
pub fn render_all(diags: &[Diagnostic], file: &str, source: &str) -> String {
    diags.iter().map(|d| render(d, file, source)).collect()
}
