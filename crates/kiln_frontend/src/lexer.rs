//! Lexical analyzer for OpenCL C source text.
//!
//! Produces [`Token`]s with line/column positions. Preprocessor directives are
//! removed from the token stream and returned separately as [`Directive`]s;
//! macro bodies are never expanded. A backslash-newline pair is a line
//! continuation both inside directives and in ordinary code.

use kiln_diagnostics::{Diagnostic, Location};

use crate::token::{Token, TokenKind};

/// A preprocessor directive, with continuations joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    /// The directive name, e.g. `define`. Empty for a null directive.
    pub name: String,
    /// Everything after the name, trimmed.
    pub body: String,
    /// Location of the `#`.
    pub location: Location,
}

impl Directive {
    /// For `#define`, returns the name of the defined macro.
    pub fn defined_name(&self) -> Option<&str> {
        if self.name != "define" {
            return None;
        }
        let end = self
            .body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.body.len());
        let name = &self.body[..end];
        (!name.is_empty()).then_some(name)
    }
}

/// Result of lexing one source buffer.
#[derive(Debug, Default)]
pub struct Lexed {
    /// Tokens, always terminated by [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    /// Directives in source order.
    pub directives: Vec<Directive>,
    /// Lexical errors.
    pub diagnostics: Vec<Diagnostic>,
}

/// Lexes `source` into tokens and directives.
pub fn lex(source: &str) -> Lexed {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        at_line_start: true,
        out: Lexed::default(),
    };
    lexer.lex_all();
    lexer.out
}

const PUNCT3: [&str; 3] = ["<<=", ">>=", "..."];
const PUNCT2: [&str; 20] = [
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "##",
];
const PUNCT1: &[u8] = b"()[]{};,.:?~!+-*/%<>=&|^#";

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
    out: Lexed,
}

impl Lexer<'_> {
    fn lex_all(&mut self) {
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                self.out.tokens.push(Token {
                    kind: TokenKind::Eof,
                    start: self.pos,
                    end: self.pos,
                    line: self.line,
                    column: self.column,
                });
                return;
            }
            if self.peek() == b'#' && self.at_line_start {
                self.lex_directive();
                continue;
            }
            self.at_line_start = false;
            self.next_token();
        }
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        b
    }

    /// Returns the length of a line continuation at the cursor, or 0.
    fn continuation_len(&self) -> usize {
        if self.peek() != b'\\' {
            return 0;
        }
        match (self.peek_at(1), self.peek_at(2)) {
            (b'\n', _) => 2,
            (b'\r', b'\n') => 3,
            _ => 0,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn error(&mut self, message: impl Into<String>, location: Location) {
        self.out.diagnostics.push(Diagnostic::error(message, Some(location)));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.peek().is_ascii_whitespace() {
                self.advance();
            }
            let cont = self.continuation_len();
            if cont > 0 {
                for _ in 0..cont {
                    self.advance();
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                while self.pos < self.source.len() && self.peek() != b'\n' {
                    self.advance();
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.location();
                let line_start = self.at_line_start;
                self.advance();
                self.advance();
                loop {
                    if self.pos >= self.source.len() {
                        self.error("unterminated /* comment", start);
                        break;
                    }
                    if self.peek() == b'*' && self.peek_at(1) == b'/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                // A comment does not end the leading whitespace of a line.
                self.at_line_start = self.at_line_start || line_start;
                continue;
            }
            return;
        }
    }

    fn lex_directive(&mut self) {
        let location = self.location();
        self.advance();
        let mut text = String::new();
        while self.pos < self.source.len() && self.peek() != b'\n' {
            let cont = self.continuation_len();
            if cont > 0 {
                for _ in 0..cont {
                    self.advance();
                }
                text.push(' ');
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                while self.pos < self.source.len() && self.peek() != b'\n' {
                    self.advance();
                }
                break;
            }
            text.push(self.advance() as char);
        }
        let text = text.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        self.out.directives.push(Directive {
            name: text[..split].to_string(),
            body: text[split..].trim().to_string(),
            location,
        });
    }

    fn next_token(&mut self) {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let b = self.peek();

        let kind = if b.is_ascii_alphabetic() || b == b'_' {
            while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                self.advance();
            }
            TokenKind::Identifier
        } else if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_ascii_digit()) {
            self.lex_number();
            TokenKind::Number
        } else if b == b'"' || b == b'\'' {
            self.lex_quoted(b);
            if b == b'"' {
                TokenKind::String
            } else {
                TokenKind::Char
            }
        } else {
            self.lex_punct();
            TokenKind::Punct
        };

        self.out.tokens.push(Token {
            kind,
            start,
            end: self.pos,
            line,
            column,
        });
    }

    fn lex_number(&mut self) {
        loop {
            let b = self.peek();
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.advance();
            } else if (b == b'+' || b == b'-')
                && matches!(self.source.get(self.pos.wrapping_sub(1)), Some(b'e' | b'E' | b'p' | b'P'))
            {
                self.advance();
            } else {
                return;
            }
        }
    }

    fn lex_quoted(&mut self, quote: u8) {
        let start = self.location();
        self.advance();
        loop {
            if self.pos >= self.source.len() || self.peek() == b'\n' {
                self.error(format!("missing terminating {} character", quote as char), start);
                return;
            }
            match self.advance() {
                b'\\' if self.pos < self.source.len() => {
                    self.advance();
                }
                b if b == quote => return,
                _ => {}
            }
        }
    }

    fn lex_punct(&mut self) {
        let source = self.source;
        let rest = &source[self.pos..];
        for p in PUNCT3 {
            if rest.starts_with(p.as_bytes()) {
                for _ in 0..3 {
                    self.advance();
                }
                return;
            }
        }
        for p in PUNCT2 {
            if rest.starts_with(p.as_bytes()) {
                self.advance();
                self.advance();
                return;
            }
        }
        let location = self.location();
        let start = self.pos;
        let b = self.advance();
        if !PUNCT1.contains(&b) {
            // Keep tokens on char boundaries.
            while self.pos < self.source.len() && (self.peek() & 0xc0) == 0x80 {
                self.advance();
            }
            let shown = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
            self.error(format!("invalid character '{shown}' in source"), location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        let lexed = lex(source);
        lexed
            .tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text(source).to_string())
            .collect()
    }

    #[test]
    fn lexes_kernel_signature() {
        assert_eq!(
            texts("__kernel void k(__global int* data) {}"),
            vec!["__kernel", "void", "k", "(", "__global", "int", "*", "data", ")", "{", "}"]
        );
    }

    #[test]
    fn tracks_lines_and_columns() {
        let src = "\n__kernel void k() {\n  size_t i = 1;\n}\n";
        let lexed = lex(src);
        let i = lexed.tokens.iter().find(|t| t.text(src) == "i").unwrap();
        assert_eq!((i.line, i.column), (3, 10));
        let eof = lexed.tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(texts("a<<=b->c++"), vec!["a", "<<=", "b", "->", "c", "++"]);
        assert_eq!(texts("x += 1.5e-3f"), vec!["x", "+=", "1.5e-3f"]);
        assert_eq!(texts("0x1Fu .5f"), vec!["0x1Fu", ".5f"]);
    }

    #[test]
    fn skips_comments() {
        assert_eq!(texts("a // one\n/* two\nlines */ b"), vec!["a", "b"]);
    }

    #[test]
    fn unterminated_comment_is_error() {
        let lexed = lex("a /* open");
        assert_eq!(lexed.diagnostics.len(), 1);
        assert_eq!(lexed.diagnostics[0].message, "unterminated /* comment");
    }

    #[test]
    fn directives_join_continuations() {
        let src = "#define INC10(x) \\\n  INC1(x) \\\n  INC1(x)\n__kernel void k() {}\n";
        let lexed = lex(src);
        assert_eq!(lexed.directives.len(), 1);
        let d = &lexed.directives[0];
        assert_eq!(d.name, "define");
        assert_eq!(d.defined_name(), Some("INC10"));
        assert_eq!(d.location, Location::new(1, 1));
        assert!(!lexed.tokens.iter().any(|t| t.text(src) == "INC1"));
        let kernel = &lexed.tokens[0];
        assert_eq!((kernel.text(src), kernel.line), ("__kernel", 4));
    }

    #[test]
    fn hash_after_code_is_not_a_directive() {
        let src = "a # b";
        assert_eq!(texts(src), vec!["a", "#", "b"]);
        assert!(lex(src).directives.is_empty());
    }

    #[test]
    fn indented_directive_and_pragma() {
        let src = "  #pragma OPENCL EXTENSION cl_khr_fp64 : enable\nint x;";
        let lexed = lex(src);
        assert_eq!(lexed.directives[0].name, "pragma");
        assert_eq!(lexed.directives[0].body, "OPENCL EXTENSION cl_khr_fp64 : enable");
        assert_eq!(lexed.directives[0].defined_name(), None);
    }

    #[test]
    fn strings_and_chars() {
        assert_eq!(texts(r#"printf("a\"b", 'c')"#), vec!["printf", "(", r#""a\"b""#, ",", "'c'", ")"]);
        let lexed = lex("\"open\nx");
        assert_eq!(lexed.diagnostics[0].message, "missing terminating \" character");
    }

    #[test]
    fn invalid_character() {
        let lexed = lex("a @ b");
        assert_eq!(lexed.diagnostics[0].message, "invalid character '@' in source");
        assert_eq!(lexed.diagnostics[0].location, Some(Location::new(1, 3)));
    }
}
