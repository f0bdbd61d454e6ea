//! WebAssembly text (WAT subset) front end.
//!
//! Source text goes through two stages: the [`Lexer`] classifies it into
//! [`Token`]s, and the parser turns those into a flat list of [`Statement`]s
//! ready for the emitter.
//!
//! # Example
//!
//! ```
//! use luna::wat::{self, Statement, TokenKind};
//!
//! let tokens = wat::tokenize("(module (func (export \"id\") (param i32) (result i32) local.get 0))");
//! assert_eq!(tokens[0].kind, TokenKind::Keyword);
//! assert_eq!(tokens[0].text, "module");
//!
//! let statements = wat::parse(tokens).unwrap();
//! assert_eq!(statements[1], Statement::Func);
//! assert_eq!(statements.last(), Some(&Statement::LocalGet { index: 0 }));
//! ```
//!
//! # Error Handling
//!
//! Tokenising is infallible by default; unknown characters, parentheses
//! included, are skipped. In strict mode the first unknown character other
//! than a parenthesis is an error:
//!
//! ```
//! use luna::{wat, Options};
//!
//! assert!(wat::tokenize_with("(module @)", &Options::strict()).is_err());
//! assert_eq!(wat::tokenize("(module @)").len(), 1);
//! ```

pub mod ast;
mod cursor;
mod error;
mod lexer;
mod parser;
mod token;

pub use ast::{BinaryOp, Callee, Expression, Statement};
pub use error::{LexError, ParseError};
pub use lexer::{tokenize, tokenize_with, Lexer};
pub use parser::{parse, parse_with, Parser};
pub use token::{Token, TokenKind};
