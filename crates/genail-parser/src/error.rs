use genail_common::Span;
use thiserror::Error;

/// Errors raised while turning script text into statements.
///
/// Parsing is fail-fast: the first malformed line aborts the whole parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax {
        line: u32,
        message: String,
        span: Span,
    },

    #[error("line {line}: unterminated multi-line block (missing closing \"\"\")")]
    UnterminatedPrompt { line: u32, span: Span },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::Syntax {
            line: span.line(),
            message: message.into(),
            span,
        }
    }

    pub fn unterminated(span: Span) -> Self {
        ParseError::UnterminatedPrompt {
            line: span.line(),
            span,
        }
    }

    /// 1-based line the error is attributed to.
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Syntax { line, .. } | ParseError::UnterminatedPrompt { line, .. } => *line,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } | ParseError::UnterminatedPrompt { span, .. } => *span,
        }
    }

    /// Human-readable reason without the line prefix.
    pub fn message(&self) -> String {
        match self {
            ParseError::Syntax { message, .. } => message.clone(),
            ParseError::UnterminatedPrompt { .. } => {
                "unterminated multi-line block (missing closing \"\"\")".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use genail_common::Position;

    #[test]
    fn error_display() {
        let span = Span::point(Position::new(7, 1, 40));
        let e = ParseError::syntax("unknown statement 'foo'", span);
        assert_eq!(e.to_string(), "line 7: unknown statement 'foo'");
        assert_eq!(e.message(), "unknown statement 'foo'");
        assert_eq!(e.line(), 7);
    }

    #[test]
    fn unterminated_display() {
        let e = ParseError::unterminated(Span::point(Position::new(3, 8, 20)));
        assert_eq!(e.line(), 3);
        assert!(e.to_string().starts_with("line 3: unterminated"));
        assert_eq!(
            e.message(),
            "unterminated multi-line block (missing closing \"\"\")"
        );
    }
}
