//! Token types for the WAT lexer.
//!
//! This module defines the lexical tokens produced when tokenising the
//! WebAssembly Text Format subset accepted by the compiler.

use serde::Serialize;
use std::fmt;

/// The kind of token.
///
/// The set is closed: every matcher in the lexer produces exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    /// A reserved word such as `module`, `func`, `export`, `param`, `result`, `call`.
    Keyword,

    /// An instruction mnemonic such as `local.get` or `i32.add`.
    Instruction,

    /// A value type name: `i32`, `i64`, `f32` or `f64`.
    NumType,

    /// A double-quoted string, stored with its quotes.
    Literal,

    /// An unsigned decimal integer.
    Number,

    /// A run of whitespace. Dropped by the lexer, never seen by the parser.
    Whitespace,
}

impl TokenKind {
    /// A short lowercase name for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Instruction => "instruction",
            TokenKind::NumType => "typeNum",
            TokenKind::Literal => "literal",
            TokenKind::Number => "number",
            TokenKind::Whitespace => "whitespace",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexical token with its location in source.
///
/// Tokens are immutable once produced and are consumed in order by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The matched source text, verbatim.
    pub text: String,
    /// Byte offset of the first character of the token.
    pub offset: usize,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    /// Byte offset just past the end of the token.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Whether this token is of `kind` and reads exactly `text`.
    #[must_use]
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}` at {}", self.kind, self.text, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_display() {
        let token = Token::new(TokenKind::Keyword, "module", 1);
        assert_eq!(format!("{}", token), "keyword `module` at 1");

        let token = Token::new(TokenKind::NumType, "i32", 51);
        assert_eq!(format!("{}", token), "typeNum `i32` at 51");
    }

    #[test]
    fn token_end() {
        let token = Token::new(TokenKind::Literal, "\"add\"", 10);
        assert_eq!(token.end(), 15);
    }

    #[test]
    fn token_is() {
        let token = Token::new(TokenKind::Instruction, "i32.add", 0);
        assert!(token.is(TokenKind::Instruction, "i32.add"));
        assert!(!token.is(TokenKind::Keyword, "i32.add"));
        assert!(!token.is(TokenKind::Instruction, "i32.sub"));
    }

    #[test]
    fn token_serialises_kind_in_camel_case() {
        let token = Token::new(TokenKind::NumType, "i32", 4);
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"kind":"numType","text":"i32","offset":4}"#);
    }
}
