//! Compiler diagnostics, build log parsing, and log capture.
//!
//! Backends report problems as structured [`Diagnostic`] values or as raw
//! toolchain output. [`parse_toolchain_output`] recovers structure from
//! clang-style text, [`render`] produces that text from structured values, and
//! [`LogSink`] is the caller-supplied buffer that receives the full build log.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod parse;
pub mod render;
pub mod severity;
pub mod sink;

pub use diagnostic::{Diagnostic, Location};
pub use parse::parse_toolchain_output;
pub use render::{render, render_all};
pub use severity::Severity;
pub use sink::LogSink;
