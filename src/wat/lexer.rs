//! Lexer for the WAT subset.
//!
//! Tokenises source into a stream of tokens using an ordered list of anchored
//! pattern matchers. The lexer is implemented as an iterator, producing tokens
//! lazily on demand.
//!
//! # Matching policy
//!
//! At each offset the matchers are tried in registration order and the
//! **first** one that matches wins; there is no longest-match rule. The order
//! is part of the grammar: instructions are registered before value types so
//! that `i32.add` lexes as one instruction rather than `i32` followed by a
//! stray `.add`, and keywords come first of all.
//!
//! ```
//! use luna::wat::{Lexer, TokenKind};
//!
//! let tokens = Lexer::tokenise("i32.add").unwrap();
//! assert_eq!(tokens.len(), 1);
//! assert_eq!(tokens[0].kind, TokenKind::Instruction);
//! ```
//!
//! Characters no matcher accepts are skipped one at a time. In strict mode they
//! are reported instead, except for parentheses, which the grammar never
//! inspects.

use super::error::LexError;
use super::token::{Token, TokenKind};
use crate::options::Options;
use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Matchers
// ============================================================================

/// Reserved words.
const KEYWORDS: &[&str] = &["func", "module", "export", "result", "param", "call"];

/// Instruction mnemonics. `div_s` is listed before `div` so the alternation
/// prefers it.
const INSTRUCTIONS: &[&str] = &[r"local\.get", r"i32\.(add|sub|mul|div_s|div|const)"];

const NUM_TYPES: &[&str] = &["i32", "i64", "f32", "f64"];

fn anchored(alternatives: &[&str]) -> Regex {
    let pattern = format!("^({})", alternatives.join("|"));
    Regex::new(&pattern).expect("static token pattern")
}

/// The matchers, in the order they are tried.
static MATCHERS: Lazy<Vec<(TokenKind, Regex)>> = Lazy::new(|| {
    vec![
        (TokenKind::Keyword, anchored(KEYWORDS)),
        (TokenKind::Instruction, anchored(INSTRUCTIONS)),
        (TokenKind::NumType, anchored(NUM_TYPES)),
        (TokenKind::Literal, anchored(&[r#""[^"]+""#])),
        (TokenKind::Number, anchored(&["[0-9]+"])),
        (TokenKind::Whitespace, anchored(&[r"\s+"])),
    ]
});

/// First registered matcher that accepts the start of `rest`, with the match length.
fn match_at(rest: &str) -> Option<(TokenKind, usize)> {
    MATCHERS.iter().find_map(|(kind, regex)| {
        regex
            .find(rest)
            .filter(|m| !m.is_empty())
            .map(|m| (*kind, m.end()))
    })
}

// ============================================================================
// Lexer
// ============================================================================

/// Lexer for the WAT subset.
///
/// Produces tokens via the `Iterator` trait. Whitespace is never yielded. In
/// permissive mode every item is `Ok`.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    strict: bool,
}

impl<'a> Lexer<'a> {
    /// Create a permissive lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, &Options::default())
    }

    pub fn with_options(source: &'a str, options: &Options) -> Self {
        Self {
            source,
            offset: 0,
            strict: options.is_strict(),
        }
    }

    /// Tokenise the entire source, returning all tokens or the first error.
    pub fn tokenise(source: &str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source).collect()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.source.len() {
            let start = self.offset;
            let rest = &self.source[start..];

            match match_at(rest) {
                Some((TokenKind::Whitespace, len)) => self.offset += len,
                Some((kind, len)) => {
                    self.offset += len;
                    return Some(Ok(Token::new(kind, &rest[..len], start)));
                }
                None => {
                    let ch = rest.chars().next()?;
                    self.offset += ch.len_utf8();
                    if self.strict && !matches!(ch, '(' | ')') {
                        return Some(Err(LexError::UnrecognisedCharacter { ch, offset: start }));
                    }
                }
            }
        }
        None
    }
}

/// Tokenise `source` permissively.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).flatten().collect()
}

/// Tokenise `source` under `options`, stopping at the first error in strict mode.
pub fn tokenize_with(source: &str, options: &Options) -> Result<Vec<Token>, LexError> {
    let tokens: Vec<Token> = Lexer::with_options(source, options).collect::<Result<_, _>>()?;
    crate::token_log!("Tokens: ", #tokens);
    Ok(tokens)
}


// ============================================================================
// Property-based tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The lexer must never panic, even on arbitrary unicode.
        #[test]
        fn never_panics(source in "\\PC{0,300}") {
            let _ = tokenize(&source);
        }

        /// Token text always matches the source at its offset.
        #[test]
        fn token_text_matches_source(source in "\\PC{0,200}") {
            for token in tokenize(&source) {
                prop_assert_eq!(&source[token.offset..token.end()], token.text.as_str());
            }
        }

        /// Tokens are ordered and never overlap.
        #[test]
        fn tokens_do_not_overlap(source in "[a-z0-9.()\" \\n]{0,200}") {
            let tokens = tokenize(&source);
            for window in tokens.windows(2) {
                prop_assert!(window[0].end() <= window[1].offset);
            }
        }

        /// No whitespace token ever reaches the caller.
        #[test]
        fn whitespace_never_yielded(source in "[ \\t\\nfuncparm32i.]{0,100}") {
            prop_assert!(tokenize(&source).iter().all(|t| t.kind != TokenKind::Whitespace));
        }
    }
}
