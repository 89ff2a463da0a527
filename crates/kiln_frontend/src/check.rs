//! Semantic checks over function bodies.
//!
//! The checker walks a body token by token with just enough statement
//! structure to know where declarations start, which names are in scope, and
//! when two operands meet without an operator between them. It reports the
//! same first errors clang does for the common mistakes (undeclared names,
//! missing semicolons, unbalanced delimiters) and then resynchronizes at the
//! next statement boundary.

use std::collections::HashSet;

use kiln_diagnostics::{Diagnostic, Location, Severity};

use crate::builtins;
use crate::parser::Param;
use crate::token::{Token, TokenKind};
use crate::types;

/// Names visible at file scope.
#[derive(Debug, Default, Clone)]
pub struct Env {
    /// Functions declared or defined in the program.
    pub functions: HashSet<String>,
    /// Global variables and enumerators.
    pub globals: HashSet<String>,
    /// Macros from `#define` and `-D`.
    pub macros: HashSet<String>,
    /// Names introduced by `typedef`.
    pub typedefs: HashSet<String>,
}

impl Env {
    fn is_macro(&self, name: &str) -> bool {
        self.macros.contains(name)
    }
}

/// Checks one function body. `tokens` excludes the braces; `close` is the
/// closing brace (or end of input).
pub fn check_body(
    source: &str,
    tokens: &[Token],
    close: Token,
    params: &[Param],
    env: &Env,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut checker = Checker {
        source,
        env,
        diagnostics,
        scopes: vec![params.iter().map(|p| p.name.clone()).collect()],
        groups: Vec::new(),
        stmt_start: true,
        in_decl: false,
        expect_declarator: false,
        prev: None,
        prev_operand: false,
        prev_macro: false,
        skip_name: false,
        pending: None,
        for_header: false,
        in_case: false,
    };
    checker.run(tokens, close);
}

/// What an open delimiter belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Group {
    Paren,
    Cast,
    Control,
    Call,
    MacroCall,
    Index,
    Init,
}

enum Flow {
    Next,
    Recover,
}

struct Checker<'a> {
    source: &'a str,
    env: &'a Env,
    diagnostics: &'a mut Vec<Diagnostic>,
    scopes: Vec<HashSet<String>>,
    groups: Vec<(Group, Token)>,
    stmt_start: bool,
    in_decl: bool,
    expect_declarator: bool,
    prev: Option<Token>,
    prev_operand: bool,
    prev_macro: bool,
    /// The next identifier is a member or label name, not a value.
    skip_name: bool,
    /// Group kind for the next `(`.
    pending: Option<Group>,
    for_header: bool,
    in_case: bool,
}

impl Checker<'_> {
    fn run(&mut self, tokens: &[Token], close: Token) {
        let mut i = 0;
        while i < tokens.len() {
            let tok = tokens[i];
            let next = tokens.get(i + 1).copied();
            let flow = match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Identifier => self.word(tok, next),
                TokenKind::Number | TokenKind::String | TokenKind::Char => self.literal(tok),
                TokenKind::Punct => self.punct(tok, next),
            };
            self.prev = Some(tok);
            i = match flow {
                Flow::Next => i + 1,
                Flow::Recover => self.recover(tokens, i + 1),
            };
        }

        if !self.stmt_start && self.prev_operand && !self.prev_macro {
            self.missing_semicolon();
        }
        if let Some(&(_, open)) = self.groups.first() {
            self.unclosed(open, close.location());
        }
    }

    fn text(&self, tok: Token) -> &str {
        tok.text(self.source)
    }

    fn error(&mut self, message: impl Into<String>, location: Location) {
        self.diagnostics.push(Diagnostic::error(message, Some(location)));
    }

    fn operand(&mut self, macro_like: bool) {
        self.stmt_start = false;
        self.prev_operand = true;
        self.prev_macro = macro_like;
    }

    fn operator(&mut self) {
        self.prev_operand = false;
        self.prev_macro = false;
    }

    fn is_type_name(&self, word: &str) -> bool {
        (types::is_type_word(word) || self.env.typedefs.contains(word)) && !self.is_local(word)
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    fn is_value(&self, name: &str) -> bool {
        self.is_local(name)
            || self.env.globals.contains(name)
            || self.env.functions.contains(name)
            || self.env.is_macro(name)
            || builtins::is_builtin(name)
    }

    fn is_callable(&self, name: &str) -> bool {
        self.env.functions.contains(name)
            || self.env.is_macro(name)
            || builtins::is_builtin(name)
            || self.is_local(name)
    }

    fn missing_semicolon(&mut self) {
        let Some(prev) = self.prev else {
            return;
        };
        let message = if self.in_decl {
            "expected ';' at end of declaration"
        } else {
            "expected ';' after expression"
        };
        self.diagnostics
            .push(Diagnostic::error(message, Some(prev.end_location())).with_note(";"));
    }

    fn unclosed(&mut self, open: Token, at: Location) {
        let closer = match self.text(open) {
            "(" => ")",
            "[" => "]",
            _ => "}",
        };
        self.error(format!("expected '{closer}'"), at);
        let message = format!("to match this '{}'", self.text(open));
        self.diagnostics.push(Diagnostic {
            severity: Severity::Note,
            message,
            location: Some(open.location()),
            notes: Vec::new(),
        });
    }

    /// Skips to the next statement boundary after an error.
    fn recover(&mut self, tokens: &[Token], mut i: usize) -> usize {
        self.groups.clear();
        self.pending = None;
        self.in_decl = false;
        self.expect_declarator = false;
        self.for_header = false;
        self.operator();
        self.stmt_start = true;
        while i < tokens.len() {
            let tok = tokens[i];
            if tok.kind == TokenKind::Punct {
                match self.text(tok) {
                    ";" => return i + 1,
                    "{" | "}" => return i,
                    _ => {}
                }
            }
            i += 1;
        }
        i
    }

    fn word(&mut self, tok: Token, next: Option<Token>) -> Flow {
        let source = self.source;
        let text = tok.text(source);

        if self.skip_name {
            self.skip_name = false;
            self.operand(false);
            return Flow::Next;
        }

        if builtins::is_keyword(text) {
            match text {
                "if" | "while" | "switch" => {
                    self.pending = Some(Group::Control);
                    self.for_header = false;
                }
                "for" => {
                    self.pending = Some(Group::Control);
                    self.for_header = true;
                }
                "else" | "do" => self.stmt_start = true,
                "case" | "default" => {
                    self.in_case = true;
                    self.stmt_start = false;
                }
                "goto" => {
                    self.skip_name = true;
                    self.stmt_start = false;
                }
                _ => self.stmt_start = false,
            }
            self.operator();
            return Flow::Next;
        }

        if self.is_type_name(text) {
            if self.stmt_start {
                self.in_decl = true;
                self.expect_declarator = true;
                self.stmt_start = false;
            }
            if matches!(text, "struct" | "union" | "enum") {
                self.skip_name = true;
            }
            self.operator();
            return Flow::Next;
        }

        if self.expect_declarator {
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(text.to_string());
            }
            self.expect_declarator = false;
            self.operand(false);
            return Flow::Next;
        }

        let is_macro = self.env.is_macro(text);
        if self.prev_operand && !self.prev_macro && !is_macro {
            self.missing_semicolon();
            return Flow::Recover;
        }

        // Labels: `name:` at the start of a statement.
        if self.stmt_start && next.is_some_and(|n| n.is_punct(source, ":")) && !self.in_case {
            return Flow::Next;
        }

        let is_call = next.is_some_and(|n| n.is_punct(source, "("));
        if is_call {
            if !self.is_callable(text) {
                self.error(
                    format!("implicit declaration of function '{text}' is invalid in OpenCL"),
                    tok.location(),
                );
            }
            self.pending = Some(if is_macro { Group::MacroCall } else { Group::Call });
        } else if !self.is_value(text) {
            self.error(format!("use of undeclared identifier '{text}'"), tok.location());
        }
        self.operand(is_macro);
        Flow::Next
    }

    fn literal(&mut self, tok: Token) -> Flow {
        let concatenates = tok.kind == TokenKind::String
            && self.prev.is_some_and(|p| p.kind == TokenKind::String);
        if self.prev_operand && !self.prev_macro && !concatenates {
            self.missing_semicolon();
            return Flow::Recover;
        }
        self.operand(false);
        Flow::Next
    }

    fn punct(&mut self, tok: Token, next: Option<Token>) -> Flow {
        let source = self.source;
        match tok.text(source) {
            "(" => {
                let kind = match self.pending.take() {
                    Some(kind) => kind,
                    None if next.is_some_and(|n| {
                        n.kind == TokenKind::Identifier && self.is_type_name(n.text(source))
                    }) =>
                    {
                        Group::Cast
                    }
                    None => Group::Paren,
                };
                self.groups.push((kind, tok));
                self.stmt_start = kind == Group::Control && self.for_header;
                self.operator();
            }
            ")" => {
                let Some((kind, open)) = self.groups.pop() else {
                    self.error("extraneous ')' before ';'", tok.location());
                    return Flow::Recover;
                };
                match kind {
                    Group::Index | Group::Init => {
                        self.unclosed(open, tok.location());
                        return Flow::Recover;
                    }
                    Group::Control => {
                        self.operator();
                        self.stmt_start = true;
                        self.in_decl = false;
                        self.for_header = false;
                    }
                    Group::Cast => self.operator(),
                    Group::MacroCall => self.operand(true),
                    Group::Paren | Group::Call => self.operand(false),
                }
            }
            "[" => {
                self.groups.push((Group::Index, tok));
                self.operator();
            }
            "]" => match self.groups.pop() {
                Some((Group::Index, _)) => self.operand(false),
                Some((_, open)) => {
                    self.unclosed(open, tok.location());
                    return Flow::Recover;
                }
                None => {
                    self.error("expected expression", tok.location());
                    return Flow::Recover;
                }
            },
            "{" => {
                let initializer = self.in_decl
                    && (self.prev.is_some_and(|p| p.is_punct(source, "="))
                        || self.groups.last().is_some_and(|(g, _)| *g == Group::Init));
                if initializer {
                    self.groups.push((Group::Init, tok));
                } else {
                    if let Some(&(_, open)) = self.groups.first() {
                        self.unclosed(open, tok.location());
                        self.groups.clear();
                    }
                    self.scopes.push(HashSet::new());
                    self.stmt_start = true;
                    self.in_decl = false;
                }
                self.operator();
            }
            "}" => {
                if self.groups.last().is_some_and(|(g, _)| *g == Group::Init) {
                    self.groups.pop();
                    self.operand(false);
                    return Flow::Next;
                }
                if !self.stmt_start && self.prev_operand && !self.prev_macro {
                    self.missing_semicolon();
                }
                if let Some(&(_, open)) = self.groups.first() {
                    self.unclosed(open, tok.location());
                    self.groups.clear();
                }
                if self.scopes.len() > 1 {
                    self.scopes.pop();
                } else {
                    self.error("extraneous closing brace ('}')", tok.location());
                }
                self.stmt_start = true;
                self.in_decl = false;
                self.expect_declarator = false;
                self.operator();
            }
            ";" => {
                let in_for_header = self.groups.last().is_some_and(|(g, _)| *g == Group::Control);
                if !in_for_header {
                    if let Some(&(_, open)) = self.groups.first() {
                        self.unclosed(open, tok.location());
                        self.groups.clear();
                    }
                    self.in_case = false;
                }
                self.stmt_start = true;
                self.in_decl = false;
                self.expect_declarator = false;
                self.operator();
            }
            "," => {
                if self.in_decl && self.groups.iter().all(|(g, _)| *g == Group::Control) {
                    self.expect_declarator = true;
                }
                self.operator();
            }
            "." | "->" => {
                self.skip_name = true;
                self.operator();
            }
            ":" => {
                if self.in_case {
                    self.in_case = false;
                    self.stmt_start = true;
                }
                self.operator();
            }
            "++" | "--" => {
                // Postfix keeps the operand; prefix starts one.
                if !self.prev_operand {
                    self.stmt_start = false;
                    self.operator();
                }
            }
            "*" if self.expect_declarator => {}
            _ => {
                self.stmt_start = false;
                self.operator();
            }
        }
        Flow::Next
    }
}
