use genail_common::Position;

use super::cursor::Cursor;
use super::token::{Token, TokenKind};
use crate::error::{ParseError, Result};

/// Splits one physical script line into tokens.
///
/// Scanning stops at an opening `"""`: the rest of the line becomes the
/// lexeme of a single `TripleQuote` token (whose span covers only the
/// delimiter) and is never tokenized.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(line: &'src str, start: Position) -> Self {
        Self {
            cursor: Cursor::new(line, start),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        loop {
            self.cursor.eat_while(char::is_whitespace);
            let start = self.cursor.position();
            let Some(ch) = self.cursor.peek() else {
                break;
            };

            match ch {
                '"' if self.cursor.at_triple_quote() => {
                    self.cursor.advance();
                    self.cursor.advance();
                    self.cursor.advance();
                    let span = self.cursor.span_from(start);
                    let rest = self.cursor.take_rest();
                    self.tokens.push(Token::new(TokenKind::TripleQuote, rest, span));
                    break;
                }
                '"' => {
                    let token = self.scan_string(start)?;
                    self.tokens.push(token);
                }
                '=' => {
                    self.cursor.advance();
                    let span = self.cursor.span_from(start);
                    self.tokens.push(Token::new(TokenKind::Equals, "=", span));
                }
                _ => {
                    self.cursor
                        .eat_while(|c| !c.is_whitespace() && c != '=' && c != '"');
                    let lexeme = self.cursor.slice_from(start);
                    let span = self.cursor.span_from(start);
                    self.tokens.push(Token::new(TokenKind::Word, lexeme, span));
                }
            }
        }
        Ok(self.tokens)
    }

    /// Scan a double-quoted literal. `\"` is the only escape; any other
    /// backslash is kept as written.
    fn scan_string(&mut self, start: Position) -> Result<Token> {
        self.cursor.advance(); // opening "
        let mut value = String::new();
        loop {
            match self.cursor.advance() {
                Some('"') => {
                    let span = self.cursor.span_from(start);
                    return Ok(Token::new(TokenKind::Str, value, span));
                }
                Some('\\') if self.cursor.peek() == Some('"') => {
                    self.cursor.advance();
                    value.push('"');
                }
                Some(c) => value.push(c),
                None => {
                    let span = self.cursor.span_from(start);
                    return Err(ParseError::syntax("unterminated string literal", span));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(line: &str) -> Vec<Token> {
        Lexer::new(line, Position::new(1, 1, 0)).tokenize().unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn words_strings_and_equals() {
        let tokens = lex(r#"set topic = "AI agents""#);
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Word, TokenKind::Word, TokenKind::Equals, TokenKind::Str]
        );
        assert_eq!(tokens[3].lexeme, "AI agents");
    }

    #[test]
    fn key_value_without_spaces() {
        let tokens = lex("temperature=0.3 max_tokens=10");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].lexeme, "temperature");
        assert_eq!(tokens[1].kind, TokenKind::Equals);
        assert_eq!(tokens[2].lexeme, "0.3");
    }

    #[test]
    fn escaped_quote_in_string() {
        let tokens = lex(r#"print "say \"hi\" \n""#);
        assert_eq!(tokens[1].lexeme, r#"say "hi" \n"#);
    }

    #[test]
    fn triple_quote_captures_rest_of_line() {
        let tokens = lex(r#"prompt """Write about "{topic}"."#);
        assert_eq!(kinds(&tokens), vec![TokenKind::Word, TokenKind::TripleQuote]);
        assert_eq!(tokens[1].lexeme, r#"Write about "{topic}"."#);
    }

    #[test]
    fn unterminated_string_errors() {
        let result = Lexer::new(r#"print "oops"#, Position::new(5, 1, 30)).tokenize();
        match result {
            Err(ParseError::Syntax { line, message, .. }) => {
                assert_eq!(line, 5);
                assert!(message.contains("unterminated string"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn spans_track_columns() {
        let tokens = lex("print  result");
        assert_eq!(tokens[1].span.start.column, 8);
        assert_eq!(tokens[1].span.start.offset, 7);
    }
}
