mod statements;

use genail_common::{Position, Span};

use crate::ast::Statement;
use crate::error::{ParseError, Result};
use crate::lexer::Lexer;

use statements::{BlockHead, LineOutcome, LineParser};

const TRIPLE_QUOTE: &str = "\"\"\"";
/// Byte order mark some editors write at the start of UTF-8 files.
const BOM: char = '\u{feff}';

/// Scanner state between physical lines.
enum Mode {
    Normal,
    Collecting(PendingBlock),
}

/// A `"""` block that has been opened but not yet closed.
struct PendingBlock {
    head: BlockHead,
    /// Span of the whole opening line; becomes the statement's span.
    statement_span: Span,
    /// Span of the opening delimiter, reported if the block never closes.
    opened: Span,
    parts: Vec<String>,
}

/// Line-oriented parser for GenAIL scripts.
///
/// A single left-to-right pass over physical lines. Outside a block every
/// non-blank, non-comment line is one statement; inside a block lines are
/// collected verbatim until the closing `"""`.
pub struct Parser<'src> {
    source: &'src str,
    statements: Vec<Statement>,
    mode: Mode,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            statements: Vec::new(),
            mode: Mode::Normal,
        }
    }

    /// Parse the whole script. Stops at the first malformed line.
    pub fn parse(mut self) -> Result<Vec<Statement>> {
        // Offsets stay relative to the original text, BOM included.
        let body = self.source.strip_prefix(BOM).unwrap_or(self.source);
        let mut offset = (self.source.len() - body.len()) as u32;
        for (index, raw) in body.split_inclusive('\n').enumerate() {
            let text = raw.strip_suffix('\n').unwrap_or(raw);
            let text = text.strip_suffix('\r').unwrap_or(text);
            let start = Position::new(index as u32 + 1, 1, offset);
            self.scan_line(text, start)?;
            offset += raw.len() as u32;
        }

        if let Mode::Collecting(block) = self.mode {
            return Err(ParseError::unterminated(block.opened));
        }
        Ok(self.statements)
    }

    fn scan_line(&mut self, text: &str, start: Position) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Collecting(mut block) => match text.find(TRIPLE_QUOTE) {
                Some(idx) => {
                    check_after_close(text, idx, start)?;
                    block.parts.push(text[..idx].to_string());
                    self.finish_block(block);
                }
                None => {
                    block.parts.push(text.to_string());
                    self.mode = Mode::Collecting(block);
                }
            },
            Mode::Normal => {
                let trimmed = text.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Ok(());
                }

                let line_span = line_span(text, start);
                let tokens = Lexer::new(text, start).tokenize()?;
                match LineParser::new(&tokens, line_span).parse()? {
                    LineOutcome::Complete(kind) => {
                        self.statements.push(Statement::new(kind, line_span));
                    }
                    LineOutcome::Block {
                        head,
                        first,
                        opened,
                    } => {
                        let block = PendingBlock {
                            head,
                            statement_span: line_span,
                            opened,
                            parts: Vec::new(),
                        };
                        self.open_block(block, &first, opened.end)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle the text following an opening `"""`, which may already close the block.
    fn open_block(&mut self, mut block: PendingBlock, first: &str, at: Position) -> Result<()> {
        match first.find(TRIPLE_QUOTE) {
            Some(idx) => {
                check_after_close(first, idx, at)?;
                block.parts.push(first[..idx].to_string());
                self.finish_block(block);
            }
            None => {
                block.parts.push(first.to_string());
                self.mode = Mode::Collecting(block);
            }
        }
        Ok(())
    }

    fn finish_block(&mut self, block: PendingBlock) {
        let mut parts = block.parts;
        if parts.len() > 1 && parts.first().is_some_and(|p| p.trim().is_empty()) {
            parts.remove(0);
        }
        if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
            parts.pop();
        }
        if parts.len() == 1 && parts[0].trim().is_empty() {
            parts.clear();
        }
        let text = parts.join("\n");
        self.statements.push(Statement::new(
            block.head.into_statement(text),
            block.statement_span,
        ));
    }
}

/// Span covering the visible text of a line.
fn line_span(text: &str, start: Position) -> Span {
    let end = Position::new(
        start.line,
        start.column + text.chars().count() as u32,
        start.offset + text.len() as u32,
    );
    Span::new(start, end)
}

/// Only whitespace may follow a closing `"""`.
fn check_after_close(text: &str, idx: usize, start: Position) -> Result<()> {
    let trailing = &text[idx + TRIPLE_QUOTE.len()..];
    if trailing.trim().is_empty() {
        return Ok(());
    }
    let column = start.column + text[..idx + TRIPLE_QUOTE.len()].chars().count() as u32;
    let offset = start.offset + (idx + TRIPLE_QUOTE.len()) as u32;
    let from = Position::new(start.line, column, offset);
    let to = Position::new(
        start.line,
        column + trailing.chars().count() as u32,
        offset + trailing.len() as u32,
    );
    Err(ParseError::syntax(
        "unexpected text after closing \"\"\"",
        Span::new(from, to),
    ))
}

/// Parse a script into its statement sequence.
pub fn parse(source: &str) -> Result<Vec<Statement>> {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn kinds(source: &str) -> Vec<StatementKind> {
        parse(source)
            .unwrap()
            .into_iter()
            .map(|s| s.kind)
            .collect()
    }

    fn keywords(source: &str) -> Vec<&'static str> {
        parse(source)
            .unwrap()
            .iter()
            .map(|s| s.kind.keyword())
            .collect()
    }

    fn syntax_error(source: &str) -> (u32, String) {
        match parse(source) {
            Err(ParseError::Syntax { line, message, .. }) => (line, message),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn parses_prompt_and_generate() {
        let script = r#"
model "demo"
set topic = "lang"

prompt """
Write about {topic}.
"""

generate out from prompt temperature=0.3 max_tokens=10
print out
"#;
        assert_eq!(
            keywords(script),
            vec!["model", "set", "prompt", "generate", "print"]
        );
    }

    #[test]
    fn statement_fields() {
        let script = r#"model "gpt-4o-mini"
set topic = "AI"
template greeting = "Hello {topic}!"
message system "You are terse."
call greet name="Ada" times=2 into result
print greeting
print "done"
"#;
        assert_eq!(
            kinds(script),
            vec![
                StatementKind::Model {
                    name: "gpt-4o-mini".into()
                },
                StatementKind::Set {
                    name: "topic".into(),
                    value: "AI".into()
                },
                StatementKind::Template {
                    name: "greeting".into(),
                    value: "Hello {topic}!".into()
                },
                StatementKind::Message {
                    role: "system".into(),
                    content: "You are terse.".into()
                },
                StatementKind::Call(CallStmt {
                    tool: "greet".into(),
                    args: vec![
                        CallArg {
                            key: "name".into(),
                            value: "Ada".into()
                        },
                        CallArg {
                            key: "times".into(),
                            value: "2".into()
                        },
                    ],
                    target: "result".into(),
                }),
                StatementKind::Print {
                    operand: PrintOperand::Name("greeting".into())
                },
                StatementKind::Print {
                    operand: PrintOperand::Literal("done".into())
                },
            ]
        );
    }

    #[test]
    fn generate_options() {
        let stmts = kinds(
            r#"generate out from messages temperature=0.2 max_tokens=64 format=json schema="{\"type\":\"object\"}""#,
        );
        assert_eq!(
            stmts[0],
            StatementKind::Generate(GenerateStmt {
                target: "out".into(),
                source: "messages".into(),
                temperature: Some("0.2".into()),
                max_tokens: Some("64".into()),
                format: Some("json".into()),
                schema: Some(r#"{"type":"object"}"#.into()),
            })
        );
    }

    #[test]
    fn generate_without_options() {
        let stmts = kinds("generate out from prompt");
        match &stmts[0] {
            StatementKind::Generate(g) => {
                assert_eq!(g.target, "out");
                assert_eq!(g.source, "prompt");
                assert!(g.temperature.is_none());
                assert!(g.max_tokens.is_none());
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let script = "# header\n\n   # indented comment\nprint x\n\n";
        assert_eq!(keywords(script), vec!["print"]);
    }

    #[test]
    fn line_numbers_are_retained() {
        let stmts = parse("# c\n\nset a = \"1\"\nprompt \"\"\"\nx\n\"\"\"\nprint a\n").unwrap();
        let lines: Vec<u32> = stmts.iter().map(|s| s.line()).collect();
        assert_eq!(lines, vec![3, 4, 7]);
    }

    #[test]
    fn block_keeps_comments_and_blank_lines() {
        let script = "prompt \"\"\"\n# not a comment\n\n  indented\n\"\"\"\n";
        assert_eq!(
            kinds(script),
            vec![StatementKind::Prompt {
                text: "# not a comment\n\n  indented".into()
            }]
        );
    }

    #[test]
    fn single_line_block() {
        assert_eq!(
            kinds("prompt \"\"\"Say hi to {name}.\"\"\""),
            vec![StatementKind::Prompt {
                text: "Say hi to {name}.".into()
            }]
        );
    }

    #[test]
    fn block_with_text_on_delimiter_lines() {
        let script = "message user \"\"\"First line\nsecond line\nlast\"\"\"\n";
        assert_eq!(
            kinds(script),
            vec![StatementKind::Message {
                role: "user".into(),
                content: "First line\nsecond line\nlast".into()
            }]
        );
    }

    #[test]
    fn set_and_print_accept_blocks() {
        let script = "set intro = \"\"\"\nHello\nthere\n\"\"\"\nprint \"\"\"\nbye\n\"\"\"\n";
        assert_eq!(
            kinds(script),
            vec![
                StatementKind::Set {
                    name: "intro".into(),
                    value: "Hello\nthere".into()
                },
                StatementKind::Print {
                    operand: PrintOperand::Literal("bye".into())
                },
            ]
        );
    }

    #[test]
    fn empty_block() {
        assert_eq!(
            kinds("prompt \"\"\"\n\"\"\"\n"),
            vec![StatementKind::Prompt {
                text: String::new()
            }]
        );
    }

    #[test]
    fn leading_byte_order_mark_is_skipped() {
        let source = "\u{feff}model \"m\"\nprint \"x\"\n";
        let statements = parse(source).unwrap();
        assert_eq!(
            statements[0].kind,
            StatementKind::Model { name: "m".into() }
        );
        assert_eq!(statements[0].line(), 1);
        // Spans still index into the original text.
        let first = statements[0].span.byte_range();
        assert_eq!(&source[first.start..first.start + 5], "model");
        assert_eq!(statements[1].line(), 2);
    }

    #[test]
    fn crlf_line_endings() {
        let script = "set a = \"x\"\r\nprompt \"\"\"\r\nline\r\n\"\"\"\r\n";
        assert_eq!(
            kinds(script),
            vec![
                StatementKind::Set {
                    name: "a".into(),
                    value: "x".into()
                },
                StatementKind::Prompt {
                    text: "line".into()
                },
            ]
        );
    }

    #[test]
    fn set_accepts_bare_token() {
        assert_eq!(
            kinds("set count = 3"),
            vec![StatementKind::Set {
                name: "count".into(),
                value: "3".into()
            }]
        );
    }

    #[test]
    fn unterminated_block_reports_opening_line() {
        let script = "set a = \"1\"\n\nprompt \"\"\"\nnever closed\n# still inside\n";
        match parse(script) {
            Err(ParseError::UnterminatedPrompt { line, span }) => {
                assert_eq!(line, 3);
                assert_eq!(span.start.column, 8);
            }
            other => panic!("expected unterminated error, got {:?}", other),
        }
    }

    #[test]
    fn raises_on_unknown_statement() {
        let (line, message) = syntax_error("print a\nbad stuff\n");
        assert_eq!(line, 2);
        assert!(message.contains("unknown statement 'bad'"), "got: {}", message);
    }

    #[test]
    fn fails_fast_at_first_error() {
        let (line, _) = syntax_error("set = \"x\"\nalso bad\n");
        assert_eq!(line, 1);
    }

    #[test]
    fn set_missing_equals() {
        let (_, message) = syntax_error("set topic \"AI\"");
        assert!(message.contains("expected '='"), "got: {}", message);
    }

    #[test]
    fn unmatched_quote() {
        let (line, message) = syntax_error("\nmessage user \"hello");
        assert_eq!(line, 2);
        assert!(message.contains("unterminated string"), "got: {}", message);
    }

    #[test]
    fn generate_malformed_from_clause() {
        let (_, message) = syntax_error("generate out prompt");
        assert!(message.contains("expected 'from'"), "got: {}", message);
        let (_, message) = syntax_error("generate out from");
        assert!(message.contains("source variable"), "got: {}", message);
        let (_, message) = syntax_error("generate out");
        assert!(message.contains("missing 'from"), "got: {}", message);
    }

    #[test]
    fn generate_unsupported_option() {
        let (_, message) = syntax_error("generate out from prompt top_p=0.9");
        assert!(message.contains("unsupported generate option 'top_p'"), "got: {}", message);
    }

    #[test]
    fn generate_option_missing_equals() {
        let (_, message) = syntax_error("generate out from prompt temperature 0.9");
        assert!(message.contains("expected '=' after 'temperature'"), "got: {}", message);
    }

    #[test]
    fn call_missing_tool_name() {
        let (_, message) = syntax_error("call into result");
        assert_eq!(message, "missing tool name");
        let (_, message) = syntax_error("call");
        assert_eq!(message, "missing tool name");
    }

    #[test]
    fn call_missing_into() {
        let (_, message) = syntax_error("call greet name=\"Ada\"");
        assert!(message.contains("missing 'into"), "got: {}", message);
    }

    #[test]
    fn call_argument_missing_equals() {
        let (_, message) = syntax_error("call greet name \"Ada\" into r");
        assert!(message.contains("expected '=' after 'name'"), "got: {}", message);
    }

    #[test]
    fn call_without_arguments() {
        let stmts = kinds("call now into stamp");
        assert_eq!(
            stmts[0],
            StatementKind::Call(CallStmt {
                tool: "now".into(),
                args: vec![],
                target: "stamp".into(),
            })
        );
    }

    #[test]
    fn trailing_tokens_rejected() {
        let (_, message) = syntax_error("print a b");
        assert!(message.contains("unexpected 'b'"), "got: {}", message);
    }

    #[test]
    fn text_after_closing_delimiter_rejected() {
        let (line, message) = syntax_error("prompt \"\"\"\nbody\n\"\"\" trailing\n");
        assert_eq!(line, 3);
        assert!(message.contains("after closing"), "got: {}", message);
    }

    #[test]
    fn generate_block_payload_rejected() {
        let (_, message) = syntax_error("generate out from \"\"\"\n");
        assert!(message.contains("source variable"), "got: {}", message);
    }

    #[test]
    fn statements_serialize_with_kind_tag() {
        let stmts = parse("set topic = \"AI\"\nprint topic\n").unwrap();
        let json = serde_json::to_value(&stmts).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "set", "name": "topic", "value": "AI"},
                {"kind": "print", "operand": {"name": "topic"}},
            ])
        );
    }
}
