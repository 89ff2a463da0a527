//! Top-level declaration parser.
//!
//! Recognizes function definitions and prototypes (with `__kernel` signatures
//! in full), global variables, typedefs, and tagged types. Function bodies are
//! not parsed here; their token ranges are handed to the body checker.

use std::collections::HashSet;

use kiln_diagnostics::{Diagnostic, Location, Severity};
use kiln_spirv::{AddressSpace, ArgType};

use crate::token::{Token, TokenKind};
use crate::types;

/// One function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    /// Declared name; empty in unnamed prototype parameters.
    pub name: String,
    /// Reflected type.
    pub ty: ArgType,
    /// Location of the first token of the parameter.
    pub location: Location,
}

/// One function definition or prototype.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Declared with `__kernel` or `kernel`.
    pub is_kernel: bool,
    /// Parameters in order.
    pub params: Vec<Param>,
    /// Token indices of the body, excluding the braces. `None` for a prototype.
    pub body: Option<(usize, usize)>,
    /// Location of the function name.
    pub location: Location,
}

/// Top-level declarations of one source buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    /// Functions in source order.
    pub functions: Vec<Function>,
    /// Global variables and enumerators.
    pub globals: Vec<String>,
    /// Names introduced by `typedef`.
    pub typedefs: Vec<String>,
}

/// Parses the top-level declarations in `tokens`.
///
/// `typedefs` holds type names declared elsewhere, e.g. in included headers.
pub fn parse_program(
    source: &str,
    tokens: &[Token],
    typedefs: &HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Program {
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        typedefs: typedefs.clone(),
        diagnostics,
        program: Program::default(),
    };
    parser.parse_all();
    parser.program
}

/// Declaration specifiers collected before a declarator.
#[derive(Default)]
struct Specifiers<'s> {
    is_kernel: bool,
    space: Option<AddressSpace>,
    words: Vec<&'s str>,
    user_type: Option<String>,
    first: Option<Token>,
}

impl Specifiers<'_> {
    fn has_type(&self) -> bool {
        !self.words.is_empty() || self.user_type.is_some()
    }

    fn base_type(&self) -> ArgType {
        match &self.user_type {
            Some(name) => ArgType::Opaque(name.clone()),
            None => types::combine(&self.words).unwrap_or_else(ArgType::int),
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    typedefs: HashSet<String>,
    diagnostics: &'a mut Vec<Diagnostic>,
    program: Program,
}

impl<'a> Parser<'a> {
    fn parse_all(&mut self) {
        while !self.at_eof() {
            let tok = self.current();
            if tok.is_punct(self.source, ";") {
                self.pos += 1;
            } else if tok.is_word(self.source, "typedef") {
                self.parse_typedef();
            } else {
                self.parse_declaration();
            }
        }
    }

    fn current(&self) -> Token {
        self.token_at(self.pos)
    }

    fn token_at(&self, index: usize) -> Token {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[index.min(last)]
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn text(&self, tok: Token) -> &'a str {
        tok.text(self.source)
    }

    fn error(&mut self, message: impl Into<String>, location: Location) {
        self.diagnostics.push(Diagnostic::error(message, Some(location)));
    }

    /// Returns the index of the delimiter closing the one at `open`.
    fn matching(&self, open: usize) -> Option<usize> {
        let (o, c) = match self.text(self.token_at(open)) {
            "(" => ("(", ")"),
            "[" => ("[", "]"),
            _ => ("{", "}"),
        };
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            if tok.is_punct(self.source, o) {
                depth += 1;
            } else if tok.is_punct(self.source, c) {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Skips a delimited group starting at the cursor, reporting a missing closer.
    fn skip_group(&mut self) {
        let open = self.pos;
        match self.matching(open) {
            Some(close) => self.pos = close + 1,
            None => {
                self.report_unclosed(open);
                self.pos = self.tokens.len().saturating_sub(1);
            }
        }
    }

    fn report_unclosed(&mut self, open: usize) {
        let open_tok = self.token_at(open);
        let closer = match self.text(open_tok) {
            "(" => ")",
            "[" => "]",
            _ => "}",
        };
        let eof = self.tokens.last().map(|t| t.location()).unwrap_or(Location::new(1, 1));
        self.error(format!("expected '{closer}'"), eof);
        let message = format!("to match this '{}'", self.text(open_tok));
        self.diagnostics.push(Diagnostic {
            severity: Severity::Note,
            message,
            location: Some(open_tok.location()),
            notes: Vec::new(),
        });
    }

    /// Skips to the end of a malformed declaration.
    fn recover(&mut self) {
        while !self.at_eof() {
            let tok = self.current();
            if tok.is_punct(self.source, ";") {
                self.pos += 1;
                return;
            }
            if tok.is_punct(self.source, "{") {
                self.skip_group();
                return;
            }
            if tok.is_punct(self.source, "(") || tok.is_punct(self.source, "[") {
                self.skip_group();
                continue;
            }
            self.pos += 1;
        }
    }

    fn skip_attribute(&mut self) {
        self.pos += 1;
        if self.current().is_punct(self.source, "(") {
            self.skip_group();
        }
    }

    /// Parses `struct`/`union`/`enum` with optional tag and body; returns the type name.
    fn parse_tagged(&mut self) -> String {
        let keyword = self.text(self.current());
        self.pos += 1;
        let mut name = keyword.to_string();
        let tag = self.current();
        if tag.kind == TokenKind::Identifier {
            name = format!("{keyword} {}", self.text(tag));
            self.pos += 1;
        }
        if self.current().is_punct(self.source, "{") {
            let open = self.pos;
            self.skip_group();
            if keyword == "enum" {
                self.record_enumerators(open);
            }
        }
        name
    }

    fn record_enumerators(&mut self, open: usize) {
        let close = self.pos.saturating_sub(1);
        let mut expect_name = true;
        let mut depth = 0usize;
        for i in open + 1..close {
            let tok = self.token_at(i);
            match self.text(tok) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "," if depth == 0 => expect_name = true,
                _ if expect_name && tok.kind == TokenKind::Identifier => {
                    self.program.globals.push(self.text(tok).to_string());
                    expect_name = false;
                }
                _ => {}
            }
        }
    }

    fn parse_specifiers(&mut self) -> Specifiers<'a> {
        let mut spec = Specifiers::default();
        loop {
            let tok = self.current();
            if tok.kind != TokenKind::Identifier {
                return spec;
            }
            let word = self.text(tok);
            match word {
                "__kernel" | "kernel" => spec.is_kernel = true,
                "__attribute__" => {
                    self.skip_attribute();
                    continue;
                }
                "struct" | "union" | "enum" => {
                    spec.first.get_or_insert(tok);
                    spec.user_type = Some(self.parse_tagged());
                    continue;
                }
                _ if types::address_space(word).is_some() => spec.space = types::address_space(word),
                _ if types::is_plain_qualifier(word) => {}
                _ if types::builtin_type(word).is_some() && spec.user_type.is_none() => {
                    spec.first.get_or_insert(tok);
                    spec.words.push(word);
                }
                _ if self.typedefs.contains(word) && !spec.has_type() => {
                    spec.first = Some(tok);
                    spec.user_type = Some(word.to_string());
                }
                _ => return spec,
            }
            self.pos += 1;
        }
    }

    /// Consumes `*` and the qualifiers that may follow it, returning the pointer depth.
    fn parse_pointers(&mut self) -> usize {
        let mut depth = 0;
        loop {
            let tok = self.current();
            if tok.is_punct(self.source, "*") {
                depth += 1;
            } else if !(tok.kind == TokenKind::Identifier && types::is_plain_qualifier(self.text(tok))) {
                return depth;
            }
            self.pos += 1;
        }
    }

    fn parse_typedef(&mut self) {
        self.pos += 1;
        let spec = self.parse_specifiers();
        if !spec.has_type() {
            let tok = self.current();
            self.error(format!("unknown type name '{}'", self.text(tok)), tok.location());
            self.recover();
            return;
        }
        self.parse_pointers();
        let tok = self.current();
        if tok.kind != TokenKind::Identifier {
            self.error("expected identifier or '('", tok.location());
            self.recover();
            return;
        }
        self.typedefs.insert(self.text(tok).to_string());
        self.program.typedefs.push(self.text(tok).to_string());
        self.pos += 1;
        if self.current().is_punct(self.source, ";") {
            self.pos += 1;
        } else {
            let prev = self.token_at(self.pos - 1);
            self.error("expected ';' after typedef", prev.end_location());
            self.recover();
        }
    }

    fn parse_declaration(&mut self) {
        let spec = self.parse_specifiers();
        let tok = self.current();

        if !spec.has_type() {
            let next = self.token_at(self.pos + 1);
            if tok.kind == TokenKind::Identifier
                && (next.kind == TokenKind::Identifier || next.is_punct(self.source, "*"))
            {
                self.error(format!("unknown type name '{}'", self.text(tok)), tok.location());
            } else {
                self.error("expected identifier or '('", tok.location());
            }
            self.pos += 1;
            self.recover();
            return;
        }

        let depth = self.parse_pointers();
        let name_tok = self.current();
        if name_tok.is_punct(self.source, ";") {
            // A tagged type definition with no declarator.
            self.pos += 1;
            return;
        }
        if name_tok.kind != TokenKind::Identifier || types::is_type_word(self.text(name_tok)) {
            self.error("expected identifier or '('", name_tok.location());
            self.recover();
            return;
        }
        self.pos += 1;

        if self.current().is_punct(self.source, "(") {
            self.parse_function(&spec, depth, name_tok);
        } else {
            self.parse_globals(name_tok);
        }
    }

    fn parse_function(&mut self, spec: &Specifiers<'a>, depth: usize, name_tok: Token) {
        if spec.is_kernel && !(depth == 0 && spec.base_type() == ArgType::Void) {
            let at = spec.first.unwrap_or(name_tok).location();
            self.error("kernel must have void return type", at);
        }

        let params = self.parse_params(spec.is_kernel);
        let body = if self.current().is_punct(self.source, "{") {
            let open = self.pos;
            match self.matching(open) {
                Some(close) => {
                    self.pos = close + 1;
                    Some((open + 1, close))
                }
                None => {
                    self.report_unclosed(open);
                    let eof = self.tokens.len().saturating_sub(1);
                    self.pos = eof;
                    Some((open + 1, eof))
                }
            }
        } else if self.current().is_punct(self.source, ";") {
            self.pos += 1;
            None
        } else {
            let prev = self.token_at(self.pos.saturating_sub(1));
            self.error("expected ';' after top level declarator", prev.end_location());
            self.recover();
            None
        };

        let function = Function {
            name: self.text(name_tok).to_string(),
            is_kernel: spec.is_kernel,
            params,
            body,
            location: name_tok.location(),
        };
        // A definition replaces an earlier prototype of the same name.
        match self.program.functions.iter_mut().find(|f| f.name == function.name) {
            Some(existing) if existing.body.is_none() => *existing = function,
            _ => self.program.functions.push(function),
        }
    }

    fn parse_params(&mut self, is_kernel: bool) -> Vec<Param> {
        let open = self.pos;
        let Some(close) = self.matching(open) else {
            self.report_unclosed(open);
            self.pos = self.tokens.len().saturating_sub(1);
            return Vec::new();
        };

        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut start = open + 1;
        let mut depth = 0usize;
        for i in open + 1..close {
            match self.text(self.token_at(i)) {
                "(" | "[" => depth += 1,
                ")" | "]" => depth = depth.saturating_sub(1),
                "," if depth == 0 => {
                    groups.push((start, i));
                    start = i + 1;
                }
                _ => {}
            }
        }
        if start < close || !groups.is_empty() {
            groups.push((start, close));
        }
        self.pos = close + 1;

        if groups.len() == 1 {
            let (s, e) = groups[0];
            if e == s + 1 && self.token_at(s).is_word(self.source, "void") {
                return Vec::new();
            }
        }

        groups
            .into_iter()
            .filter_map(|(s, e)| self.parse_param(s, e, is_kernel))
            .collect()
    }

    fn parse_param(&mut self, start: usize, end: usize, is_kernel: bool) -> Option<Param> {
        let first = self.token_at(start);
        if start >= end {
            self.error("expected parameter declarator", first.location());
            return None;
        }

        let mut space = None;
        let mut words: Vec<&str> = Vec::new();
        let mut user_type: Option<String> = None;
        let mut depth = 0usize;
        let mut name = String::new();

        let mut i = start;
        while i < end {
            let tok = self.token_at(i);
            let word = self.text(tok);
            match tok.kind {
                TokenKind::Identifier => {
                    if word == "__attribute__" {
                        i += 1;
                        if self.token_at(i).is_punct(self.source, "(") {
                            i = self.matching(i).unwrap_or(end);
                        }
                    } else if matches!(word, "struct" | "union" | "enum") {
                        let tag = self.token_at(i + 1);
                        if i + 1 < end && tag.kind == TokenKind::Identifier {
                            user_type = Some(format!("{word} {}", self.text(tag)));
                            i += 1;
                        } else {
                            user_type = Some(word.to_string());
                        }
                    } else if let Some(s) = types::address_space(word) {
                        space = Some(s);
                    } else if types::is_plain_qualifier(word) {
                        // const, restrict and friends do not change the reflected type
                    } else if types::builtin_type(word).is_some() && user_type.is_none() && name.is_empty() {
                        words.push(word);
                    } else if self.typedefs.contains(word) && words.is_empty() && user_type.is_none() {
                        user_type = Some(word.to_string());
                    } else if words.is_empty() && user_type.is_none() {
                        self.error(format!("unknown type name '{word}'"), tok.location());
                        return None;
                    } else {
                        name = word.to_string();
                    }
                }
                TokenKind::Punct if word == "*" => depth += 1,
                TokenKind::Punct if word == "[" => {
                    depth += 1;
                    i = self.matching(i).unwrap_or(end);
                }
                _ => {
                    self.error("expected ')'", tok.location());
                    return None;
                }
            }
            i += 1;
        }

        if words.is_empty() && user_type.is_none() {
            self.error("expected parameter declarator", first.location());
            return None;
        }
        let base = match user_type {
            Some(n) => ArgType::Opaque(n),
            None => types::combine(&words).unwrap_or_else(ArgType::int),
        };

        if is_kernel {
            self.check_kernel_param(&words, depth, space, first.location());
        }
        let ty = types::pointer_to(base, depth, space.unwrap_or(AddressSpace::Private));
        Some(Param {
            name,
            ty,
            location: first.location(),
        })
    }

    fn check_kernel_param(
        &mut self,
        words: &[&str],
        depth: usize,
        space: Option<AddressSpace>,
        at: Location,
    ) {
        if depth > 0 {
            if !matches!(
                space,
                Some(AddressSpace::Global | AddressSpace::Constant | AddressSpace::Local)
            ) {
                self.error(
                    "pointer arguments to kernel functions must reside in '__global', '__constant' or '__local' address space",
                    at,
                );
            }
            return;
        }
        if matches!(
            space,
            Some(AddressSpace::Global | AddressSpace::Constant | AddressSpace::Local)
        ) {
            self.error("parameter may not be qualified with an address space", at);
        }
        if let Some(bad) = words
            .iter()
            .find(|w| matches!(**w, "bool" | "size_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t"))
        {
            self.error(format!("'{bad}' cannot be used as the type of a kernel parameter"), at);
        }
    }

    /// Records a global declaration list up to its terminating `;`.
    fn parse_globals(&mut self, first: Token) {
        self.program.globals.push(self.text(first).to_string());
        let mut expect_name = false;
        while !self.at_eof() {
            let tok = self.current();
            match self.text(tok) {
                ";" if tok.kind == TokenKind::Punct => {
                    self.pos += 1;
                    return;
                }
                "(" | "[" | "{" if tok.kind == TokenKind::Punct => {
                    self.skip_group();
                    continue;
                }
                "," if tok.kind == TokenKind::Punct => expect_name = true,
                "*" if tok.kind == TokenKind::Punct => {}
                word if expect_name && tok.kind == TokenKind::Identifier => {
                    self.program.globals.push(word.to_string());
                    expect_name = false;
                }
                _ => {}
            }
            self.pos += 1;
        }
        let prev = self.token_at(self.pos.saturating_sub(1));
        self.error("expected ';' after top level declarator", prev.end_location());
    }
}
