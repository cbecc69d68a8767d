use genail_parser::ParseError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised while parsing or executing a script.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("tool not found: '{name}'")]
    ToolNotFound { name: String },

    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Attributes an execution failure to the statement that raised it.
    #[error("line {line} ({statement}): {source}")]
    Statement {
        line: u32,
        statement: &'static str,
        source: Box<RuntimeError>,
    },
}

/// Coarse classification used by callers that map failures to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    UnterminatedPrompt,
    UndefinedVariable,
    InvalidArgument,
    Provider,
    ToolNotFound,
    ToolFailed,
}

impl RuntimeError {
    pub fn undefined(name: impl Into<String>) -> Self {
        RuntimeError::UndefinedVariable { name: name.into() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument(reason.into())
    }

    /// Wrap with the originating statement's line and keyword.
    pub fn at(self, line: u32, statement: &'static str) -> Self {
        RuntimeError::Statement {
            line,
            statement,
            source: Box::new(self),
        }
    }

    /// The underlying error, looking through statement attribution.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::Statement { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            RuntimeError::Parse(ParseError::UnterminatedPrompt { .. }) => {
                ErrorKind::UnterminatedPrompt
            }
            RuntimeError::Parse(_) => ErrorKind::Parse,
            RuntimeError::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            RuntimeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RuntimeError::Provider(_) => ErrorKind::Provider,
            RuntimeError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            RuntimeError::ToolFailed { .. } => ErrorKind::ToolFailed,
            RuntimeError::Statement { .. } => unreachable!("root() never returns a Statement"),
        }
    }

    /// Source line the error is attributed to, when known.
    pub fn line(&self) -> Option<u32> {
        match self {
            RuntimeError::Statement { line, .. } => Some(*line),
            RuntimeError::Parse(e) => Some(e.line()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
