use genail_common::{Position, Span};

/// Low-level character reader over one physical line of script text.
///
/// Tracks the current position (line, column, byte offset relative to the
/// whole script) and provides peek/advance primitives for the line lexer.
pub struct Cursor<'src> {
    source: &'src str,
    chars: std::str::Chars<'src>,
    /// Byte offset within `source` of the *next* character to be consumed.
    local: u32,
    /// Position of the first byte of `source` within the script.
    base: Position,
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str, base: Position) -> Self {
        Self {
            source,
            chars: source.chars(),
            local: 0,
            base,
            column: base.column,
        }
    }

    /// Current position in the script.
    pub fn position(&self) -> Position {
        Position {
            line: self.base.line,
            column: self.column,
            offset: self.base.offset + self.local,
        }
    }

    /// Peek at the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// True if the next three characters are `"""`.
    pub fn at_triple_quote(&self) -> bool {
        self.rest().starts_with("\"\"\"")
    }

    /// Consume and return the next character.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.local += ch.len_utf8() as u32;
        self.column += 1;
        Some(ch)
    }

    /// The unconsumed remainder of the line.
    pub fn rest(&self) -> &'src str {
        &self.source[self.local as usize..]
    }

    /// Consume everything up to the end of the line and return it.
    pub fn take_rest(&mut self) -> &'src str {
        let rest = self.rest();
        while self.advance().is_some() {}
        rest
    }

    /// Slice the line from local byte offset `start` to the current offset.
    pub fn slice_from(&self, start: Position) -> &'src str {
        let start = (start.offset - self.base.offset) as usize;
        &self.source[start..self.local as usize]
    }

    /// Build a Span from a start position to the current position.
    pub fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.position())
    }

    /// Consume characters while `predicate` returns true.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if predicate(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }
}
