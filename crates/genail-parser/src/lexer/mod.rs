pub mod cursor;
pub mod token;

mod scanner;

pub use scanner::Lexer;
pub use token::{is_identifier, Token, TokenKind};
