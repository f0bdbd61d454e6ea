//! Error types for WAT tokenising and parsing.

use thiserror::Error;

/// An error encountered during lexical analysis.
///
/// Only produced in strict mode; permissive tokenising skips what it cannot match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unrecognised character {ch:?} at {offset}")]
    UnrecognisedCharacter { ch: char, offset: usize },
}

/// An error encountered while building statements from tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no tokens to parse")]
    NoTokens,

    #[error("unexpected token: expected `{expected}`, found `{found}` at {offset}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("invalid number `{text}` at {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected {kind} `{text}` at {offset}")]
    UnexpectedStatement {
        kind: String,
        text: String,
        offset: usize,
    },
}

impl ParseError {
    /// Creates an "expected X, found Y" error.
    pub fn expected(expected: &str, found: &str, offset: usize) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            offset,
        }
    }
}
