use genail_common::Span;
use std::fmt;

/// A single token produced by the line lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// True if this is a bare word spelled exactly `text`.
    pub fn is_word(&self, text: &str) -> bool {
        self.kind == TokenKind::Word && self.lexeme == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Word => write!(f, "'{}'", self.lexeme),
            TokenKind::Str => write!(f, "string \"{}\"", self.lexeme),
            TokenKind::Equals => write!(f, "'='"),
            TokenKind::TripleQuote => write!(f, "'\"\"\"'"),
        }
    }
}

/// All token kinds a script line can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Bare run of non-space characters: keyword, identifier, number.
    Word,
    /// Double-quoted string literal; the lexeme holds the unquoted content.
    Str,
    /// `=` separating a key from its value.
    Equals,
    /// Opening `"""` of a multi-line block; the lexeme holds the rest of the line.
    TripleQuote,
}

/// True if `text` has the shape `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
