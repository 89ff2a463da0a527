//! Token types for the OpenCL C lexer.
//!
//! Tokens do not own their text. Keywords are not distinguished from
//! identifiers at this level; the parser classifies words by looking up the
//! source text through [`Token::text`].

use kiln_diagnostics::Location;

/// The lexical class of a token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    /// An identifier or keyword.
    Identifier,
    /// An integer or floating point literal, including suffixes.
    Number,
    /// A string literal.
    String,
    /// A character literal.
    Char,
    /// An operator or punctuator.
    Punct,
    /// End of input.
    Eof,
}

/// A token with its byte range and the position of its first byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    /// The lexical class.
    pub kind: TokenKind,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
    /// 1-based line of the first byte.
    pub line: u32,
    /// 1-based column of the first byte.
    pub column: u32,
}

impl Token {
    /// Returns the source text of this token.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }

    /// Returns `true` if this token is the punctuator `p`.
    pub fn is_punct(&self, source: &str, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(source) == p
    }

    /// Returns `true` if this token is the identifier or keyword `word`.
    pub fn is_word(&self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text(source) == word
    }

    /// Location of the first byte.
    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    /// Location just past the last byte. Tokens never span lines.
    pub fn end_location(&self) -> Location {
        Location::new(self.line, self.column + (self.end - self.start) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_locations() {
        let src = "  size_t i";
        let tok = Token {
            kind: TokenKind::Identifier,
            start: 2,
            end: 8,
            line: 3,
            column: 3,
        };
        assert_eq!(tok.text(src), "size_t");
        assert!(tok.is_word(src, "size_t"));
        assert!(!tok.is_punct(src, "size_t"));
        assert_eq!(tok.location(), Location::new(3, 3));
        assert_eq!(tok.end_location(), Location::new(3, 9));
    }
}
