//! Parser for GenAIL scripts: a line lexer, the statement AST, and a
//! single-pass line scanner with a multi-line block mode.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{CallArg, CallStmt, GenerateStmt, PrintOperand, Statement, StatementKind};
pub use error::ParseError;
pub use lexer::is_identifier;
pub use parser::{parse, Parser};
