use genail_common::Span;

use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::lexer::{is_identifier, Token, TokenKind};

/// What a single non-blank line parsed into.
pub(super) enum LineOutcome {
    Complete(StatementKind),
    /// The line opened a `"""` block that continues on following lines.
    /// `first` is the text after the opening delimiter.
    Block {
        head: BlockHead,
        first: String,
        opened: Span,
    },
}

/// A statement waiting for its multi-line payload.
#[derive(Debug)]
pub(super) enum BlockHead {
    Prompt,
    Set(String),
    Template(String),
    Message(String),
    Print,
}

impl BlockHead {
    pub(super) fn into_statement(self, text: String) -> StatementKind {
        match self {
            BlockHead::Prompt => StatementKind::Prompt { text },
            BlockHead::Set(name) => StatementKind::Set { name, value: text },
            BlockHead::Template(name) => StatementKind::Template { name, value: text },
            BlockHead::Message(role) => StatementKind::Message {
                role,
                content: text,
            },
            BlockHead::Print => StatementKind::Print {
                operand: PrintOperand::Literal(text),
            },
        }
    }
}

/// Payload of a statement that accepts text: inline, or the start of a block.
enum Payload {
    Text(String),
    Block { first: String, opened: Span },
}

/// Grammar for the tokens of one line.
pub(super) struct LineParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Span of the whole line, used for errors at end of line.
    line_span: Span,
}

impl<'t> LineParser<'t> {
    pub(super) fn new(tokens: &'t [Token], line_span: Span) -> Self {
        Self {
            tokens,
            pos: 0,
            line_span,
        }
    }

    pub(super) fn parse(mut self) -> Result<LineOutcome> {
        let keyword = match self.advance() {
            Some(t) if t.kind == TokenKind::Word => t,
            Some(t) => {
                return Err(ParseError::syntax(
                    format!("expected a statement keyword, found {}", t),
                    t.span,
                ))
            }
            None => return Err(ParseError::syntax("empty statement", self.line_span)),
        };

        match keyword.lexeme.as_str() {
            "model" => self.parse_model(),
            "set" => self.parse_assignment("set", BlockHead::Set),
            "template" => self.parse_assignment("template", BlockHead::Template),
            "prompt" => self.parse_prompt(),
            "message" => self.parse_message(),
            "generate" => self.parse_generate(),
            "call" => self.parse_call(),
            "print" => self.parse_print(),
            other => Err(ParseError::syntax(
                format!("unknown statement '{}'", other),
                keyword.span,
            )),
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Span just past the last token, for "expected X at end of line".
    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some(t) => Span::point(t.span.end),
            None => self.line_span,
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Word && is_identifier(&t.lexeme) => {
                Ok(t.lexeme.clone())
            }
            Some(t) if t.kind == TokenKind::Word => Err(ParseError::syntax(
                format!("invalid {} '{}'", what, t.lexeme),
                t.span,
            )),
            Some(t) => Err(ParseError::syntax(
                format!("expected {}, found {}", what, t),
                t.span,
            )),
            None => Err(ParseError::syntax(
                format!("expected {} at end of line", what),
                self.end_span(),
            )),
        }
    }

    fn expect_equals(&mut self, after: &str) -> Result<()> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Equals => Ok(()),
            Some(t) => Err(ParseError::syntax(
                format!("expected '=' after '{}', found {}", after, t),
                t.span,
            )),
            None => Err(ParseError::syntax(
                format!("expected '=' after '{}'", after),
                self.end_span(),
            )),
        }
    }

    /// Value of a `key=value` pair: quoted string, number or bare identifier.
    fn expect_value(&mut self, key: &str) -> Result<String> {
        match self.advance() {
            Some(t) if matches!(t.kind, TokenKind::Str | TokenKind::Word) => Ok(t.lexeme.clone()),
            Some(t) => Err(ParseError::syntax(
                format!("expected a value for '{}', found {}", key, t),
                t.span,
            )),
            None => Err(ParseError::syntax(
                format!("missing value for '{}'", key),
                self.end_span(),
            )),
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(ParseError::syntax(
                format!("unexpected {} at end of statement", t),
                t.span,
            )),
        }
    }

    /// A quoted string or the opening of a `"""` block. `allow_word` also
    /// accepts a single bare token as literal text.
    fn expect_payload(&mut self, what: &str, allow_word: bool) -> Result<Payload> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Str => {
                self.expect_end()?;
                Ok(Payload::Text(t.lexeme.clone()))
            }
            Some(t) if t.kind == TokenKind::Word && allow_word => {
                self.expect_end()?;
                Ok(Payload::Text(t.lexeme.clone()))
            }
            Some(t) if t.kind == TokenKind::TripleQuote => Ok(Payload::Block {
                first: t.lexeme.clone(),
                opened: t.span,
            }),
            Some(t) => Err(ParseError::syntax(
                format!("expected {}, found {}", what, t),
                t.span,
            )),
            None => Err(ParseError::syntax(
                format!("expected {} at end of line", what),
                self.end_span(),
            )),
        }
    }

    fn complete(head: BlockHead, payload: Payload) -> LineOutcome {
        match payload {
            Payload::Text(text) => LineOutcome::Complete(head.into_statement(text)),
            Payload::Block { first, opened } => LineOutcome::Block {
                head,
                first,
                opened,
            },
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// `model "name"` or `model name`
    fn parse_model(&mut self) -> Result<LineOutcome> {
        let name = match self.advance() {
            Some(t) if matches!(t.kind, TokenKind::Str | TokenKind::Word) => t.lexeme.clone(),
            Some(t) => {
                return Err(ParseError::syntax(
                    format!("expected model name, found {}", t),
                    t.span,
                ))
            }
            None => {
                return Err(ParseError::syntax(
                    "expected model name at end of line",
                    self.end_span(),
                ))
            }
        };
        self.expect_end()?;
        Ok(LineOutcome::Complete(StatementKind::Model { name }))
    }

    /// `set name = value` / `template name = value`
    fn parse_assignment(
        &mut self,
        keyword: &str,
        head: fn(String) -> BlockHead,
    ) -> Result<LineOutcome> {
        let name = self.expect_identifier("variable name")?;
        self.expect_equals(&name)?;
        let payload = self.expect_payload(&format!("a value for {} '{}'", keyword, name), true)?;
        Ok(Self::complete(head(name), payload))
    }

    /// `prompt """ ... """`
    fn parse_prompt(&mut self) -> Result<LineOutcome> {
        let payload = self.expect_payload("prompt text", false)?;
        Ok(Self::complete(BlockHead::Prompt, payload))
    }

    /// `message role "content"`
    fn parse_message(&mut self) -> Result<LineOutcome> {
        let role = match self.advance() {
            Some(t) if t.kind == TokenKind::Word => t.lexeme.clone(),
            Some(t) => {
                return Err(ParseError::syntax(
                    format!("expected message role, found {}", t),
                    t.span,
                ))
            }
            None => {
                return Err(ParseError::syntax(
                    "expected message role at end of line",
                    self.end_span(),
                ))
            }
        };
        let payload = self.expect_payload("message content", false)?;
        Ok(Self::complete(BlockHead::Message(role), payload))
    }

    /// `generate target from source [key=value ...]`
    fn parse_generate(&mut self) -> Result<LineOutcome> {
        let target = self.expect_identifier("target variable")?;
        match self.advance() {
            Some(t) if t.is_word("from") => {}
            Some(t) => {
                return Err(ParseError::syntax(
                    format!("expected 'from' after generate target, found {}", t),
                    t.span,
                ))
            }
            None => {
                return Err(ParseError::syntax(
                    format!("missing 'from <source>' clause for '{}'", target),
                    self.end_span(),
                ))
            }
        }
        let source = self.expect_identifier("source variable after 'from'")?;

        let mut stmt = GenerateStmt {
            target,
            source,
            ..GenerateStmt::default()
        };

        while let Some(key) = self.advance() {
            if key.kind != TokenKind::Word {
                return Err(ParseError::syntax(
                    format!("expected generate option, found {}", key),
                    key.span,
                ));
            }
            let slot = match key.lexeme.as_str() {
                "temperature" => &mut stmt.temperature,
                "max_tokens" => &mut stmt.max_tokens,
                "format" => &mut stmt.format,
                "schema" => &mut stmt.schema,
                other => {
                    return Err(ParseError::syntax(
                        format!(
                            "unsupported generate option '{}' (expected temperature, max_tokens, format or schema)",
                            other
                        ),
                        key.span,
                    ))
                }
            };
            self.expect_equals(&key.lexeme)?;
            *slot = Some(self.expect_value(&key.lexeme)?);
        }

        Ok(LineOutcome::Complete(StatementKind::Generate(stmt)))
    }

    /// `call tool [key=value ...] into target`
    fn parse_call(&mut self) -> Result<LineOutcome> {
        let tool = match self.peek() {
            Some(t) if t.is_word("into") => {
                return Err(ParseError::syntax("missing tool name", t.span));
            }
            None => {
                return Err(ParseError::syntax("missing tool name", self.end_span()));
            }
            Some(_) => self.expect_identifier("tool name")?,
        };

        let mut args = Vec::new();
        loop {
            let token = match self.advance() {
                Some(t) => t,
                None => {
                    return Err(ParseError::syntax(
                        format!("call to '{}' is missing 'into <variable>'", tool),
                        self.end_span(),
                    ))
                }
            };

            let is_into_clause = token.is_word("into")
                && self.peek().map(|t| t.kind) != Some(TokenKind::Equals);
            if is_into_clause {
                let target = self.expect_identifier("target variable after 'into'")?;
                self.expect_end()?;
                return Ok(LineOutcome::Complete(StatementKind::Call(CallStmt {
                    tool,
                    args,
                    target,
                })));
            }

            if token.kind != TokenKind::Word || !is_identifier(&token.lexeme) {
                return Err(ParseError::syntax(
                    format!("expected key=value argument, found {}", token),
                    token.span,
                ));
            }
            self.expect_equals(&token.lexeme)?;
            let value = self.expect_value(&token.lexeme)?;
            args.push(CallArg {
                key: token.lexeme.clone(),
                value,
            });
        }
    }

    /// `print name` or `print "literal"`
    fn parse_print(&mut self) -> Result<LineOutcome> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::Word => {
                self.expect_end()?;
                Ok(LineOutcome::Complete(StatementKind::Print {
                    operand: PrintOperand::Name(t.lexeme.clone()),
                }))
            }
            Some(t) if t.kind == TokenKind::Str => {
                self.expect_end()?;
                Ok(LineOutcome::Complete(StatementKind::Print {
                    operand: PrintOperand::Literal(t.lexeme.clone()),
                }))
            }
            Some(t) if t.kind == TokenKind::TripleQuote => Ok(LineOutcome::Block {
                head: BlockHead::Print,
                first: t.lexeme.clone(),
                opened: t.span,
            }),
            Some(t) => Err(ParseError::syntax(
                format!("expected variable name or string, found {}", t),
                t.span,
            )),
            None => Err(ParseError::syntax(
                "expected variable name or string at end of line",
                self.end_span(),
            )),
        }
    }
}
