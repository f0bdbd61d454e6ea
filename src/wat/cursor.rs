//! Token-level cursor for the parser.
//!
//! Holds the owned token sequence and an index into it. The parser looks at
//! the current token only, plus `count_while` to size operand runs.

use super::token::{Token, TokenKind};

pub struct Cursor {
    tokens: Vec<Token>,
    /// Index of the current token.
    pos: usize,
}

impl Cursor {
    /// Create a cursor positioned at the first token.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Whether every token has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The current token.
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Number of contiguous tokens of `kind` starting at the current one.
    pub fn count_while(&self, kind: TokenKind) -> usize {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .take_while(|t| t.kind == kind)
            .count()
    }

    /// Byte offset just past the last token, for end-of-input errors.
    pub fn end_offset(&self) -> usize {
        self.tokens.last().map_or(0, Token::end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<Token> {
        vec![
            Token::new(TokenKind::Keyword, "param", 0),
            Token::new(TokenKind::NumType, "i32", 6),
            Token::new(TokenKind::NumType, "i64", 10),
            Token::new(TokenKind::Keyword, "result", 15),
        ]
    }

    #[test]
    fn advance_moves_current() {
        let mut cursor = Cursor::new(tokens());
        assert_eq!(cursor.current().unwrap().text, "param");
        assert_eq!(cursor.advance().unwrap().text, "param");
        assert_eq!(cursor.current().unwrap().text, "i32");
    }

    #[test]
    fn count_contiguous_kind() {
        let mut cursor = Cursor::new(tokens());
        assert_eq!(cursor.count_while(TokenKind::NumType), 0);
        cursor.advance();
        assert_eq!(cursor.count_while(TokenKind::NumType), 2);
    }

    #[test]
    fn eof() {
        let mut cursor = Cursor::new(tokens());
        for _ in 0..4 {
            assert!(!cursor.is_eof());
            cursor.advance();
        }
        assert!(cursor.is_eof());
        assert!(cursor.advance().is_none());
        assert!(cursor.current().is_none());
        assert_eq!(cursor.count_while(TokenKind::NumType), 0);
        assert_eq!(cursor.end_offset(), 21);
    }

    #[test]
    fn empty() {
        let cursor = Cursor::new(Vec::new());
        assert!(cursor.is_eof());
        assert_eq!(cursor.end_offset(), 0);
    }
}
