use genail_common::Span;
use serde::Serialize;

/// One parsed script instruction together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StatementKind,
    #[serde(skip)]
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// 1-based line the statement starts on.
    pub fn line(&self) -> u32 {
        self.span.line()
    }
}

/// The instruction kinds a script can contain. Comments and blank lines
/// never become statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementKind {
    /// `model "name"`
    Model { name: String },
    /// `set name = "value"`
    Set { name: String, value: String },
    /// `template name = "format {var}"`
    Template { name: String, value: String },
    /// `prompt """ ... """`
    Prompt { text: String },
    /// `message role "content"`
    Message { role: String, content: String },
    /// `generate target from source [options]`
    Generate(GenerateStmt),
    /// `call tool key=value ... into target`
    Call(CallStmt),
    /// `print operand`
    Print { operand: PrintOperand },
}

impl StatementKind {
    /// Keyword that introduces this statement.
    pub fn keyword(&self) -> &'static str {
        match self {
            StatementKind::Model { .. } => "model",
            StatementKind::Set { .. } => "set",
            StatementKind::Template { .. } => "template",
            StatementKind::Prompt { .. } => "prompt",
            StatementKind::Message { .. } => "message",
            StatementKind::Generate(_) => "generate",
            StatementKind::Call(_) => "call",
            StatementKind::Print { .. } => "print",
        }
    }
}

/// A `generate` statement. Numeric options are kept as written and only
/// converted when the statement executes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GenerateStmt {
    pub target: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// A `call` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStmt {
    pub tool: String,
    /// Keyword arguments in source order.
    pub args: Vec<CallArg>,
    pub target: String,
}

/// `key=value` argument of a `call`; the value may contain `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallArg {
    pub key: String,
    pub value: String,
}

/// Operand of a `print` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintOperand {
    /// Bare word: the bound value if the variable exists, else the word itself.
    Name(String),
    /// Quoted string: always printed as written.
    Literal(String),
}
