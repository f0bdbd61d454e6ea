//! WAT Parser: Token stream -> flat statement list.
//!
//! A hand-written recursive-descent parser over the token sequence, read
//! one token at a time through a [`Cursor`]. Instruction mnemonics resolve
//! through the shared opcode table in [`crate::encoding`]. Each top-level iteration
//! dispatches on the current token's kind and text and produces exactly one
//! [`Statement`], consuming the keyword and its operands.
//!
//! # Grammar
//!
//! ```text
//! module  ::= 'module' func*
//! func    ::= 'func' ('export' literal)? ('param' type*)? ('result' type)? instr*
//! instr   ::= 'local.get' number | 'i32.const' number | 'call' (literal | number)
//!           | 'i32.add' | 'i32.sub' | 'i32.mul' | 'i32.div'
//! ```
//!
//! Parentheses never reach the parser; nesting is implied by statement order.
//!
//! # Permissive parsing
//!
//! Tokens that start no known statement become [`Statement::Nop`], and numbers
//! that do not fit their operand are read as zero. With [`Mode::Strict`] both
//! are errors.
//!
//! [`Mode::Strict`]: crate::options::Mode::Strict

use super::ast::{BinaryOp, Callee, Expression, Statement};
use super::cursor::Cursor;
use super::error::ParseError;
use super::token::{Token, TokenKind};
use crate::encoding::{OPCODES, OP_I32_CONST, OP_LOCAL_GET, VALUE_TYPES};
use crate::options::Options;

/// Parse a token sequence permissively.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Statement>, ParseError> {
    parse_with(tokens, &Options::default())
}

/// Parse a token sequence under `options`.
///
/// An empty token sequence is always an error.
pub fn parse_with(tokens: Vec<Token>, options: &Options) -> Result<Vec<Statement>, ParseError> {
    Parser::new(tokens, options).parse()
}

pub struct Parser {
    cursor: Cursor,
    strict: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, options: &Options) -> Self {
        Self {
            cursor: Cursor::new(tokens),
            strict: options.is_strict(),
        }
    }

    pub fn parse(mut self) -> Result<Vec<Statement>, ParseError> {
        if self.cursor.is_eof() {
            return Err(ParseError::NoTokens);
        }

        let mut statements = Vec::new();
        while !self.cursor.is_eof() {
            let statement = self.parse_statement()?;
            crate::ast_log!("Parsed ", #statement);
            statements.push(statement);
        }
        Ok(statements)
    }

    // ------------------------------------------------------------------------
    // Token consumption
    // ------------------------------------------------------------------------

    /// Consume the current token, checking its text when `expected` is given.
    fn eat(&mut self, expected: Option<&str>) -> Result<Token, ParseError> {
        let Some(current) = self.cursor.current() else {
            return Err(ParseError::UnexpectedEnd {
                expected: expected.unwrap_or("a token").to_string(),
            });
        };
        if let Some(expected) = expected {
            if current.text != expected {
                return Err(ParseError::expected(expected, &current.text, current.offset));
            }
        }
        let token = current.clone();
        self.cursor.advance();
        Ok(token)
    }

    /// Read the current token as an operand.
    ///
    /// Always consumes exactly one token.
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.eat(None)?;
        let expression = match token.kind {
            TokenKind::Number => Expression::Number(self.integer(&token)?),
            TokenKind::Literal => Expression::Literal(token.text),
            TokenKind::NumType => Expression::TypeName(token.text),
            _ => Expression::Other(token.text),
        };
        Ok(expression)
    }

    /// Convert number text, reading unrepresentable values as zero unless strict.
    fn integer(&self, token: &Token) -> Result<i64, ParseError> {
        match token.text.parse::<i64>() {
            Ok(n) => Ok(n),
            Err(_) => self.recover(token, 0),
        }
    }

    /// The permissive fallback `value`, or an `InvalidNumber` error in strict mode.
    fn recover<T>(&self, token: &Token, value: T) -> Result<T, ParseError> {
        if self.strict {
            Err(ParseError::InvalidNumber {
                text: token.text.clone(),
                offset: token.offset,
            })
        } else {
            Ok(value)
        }
    }

    /// The numeric operand of an instruction.
    ///
    /// A missing operand reads as zero, leaving the following token in place.
    fn numeric_operand(&mut self, instruction: &Token) -> Result<(i64, Token), ParseError> {
        match self.cursor.current() {
            Some(token) if token.kind == TokenKind::Number => {
                let token = token.clone();
                let n = match self.parse_expression()? {
                    Expression::Number(n) => n,
                    _ => 0,
                };
                Ok((n, token))
            }
            Some(token) if self.strict => Err(ParseError::expected(
                &format!("number after {}", instruction.text),
                &token.text,
                token.offset,
            )),
            None if self.strict => Err(ParseError::UnexpectedEnd {
                expected: format!("number after {}", instruction.text),
            }),
            _ => Ok((0, instruction.clone())),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let Some(token) = self.cursor.current().cloned() else {
            return Err(ParseError::UnexpectedEnd {
                expected: "a statement".to_string(),
            });
        };

        match token.kind {
            TokenKind::Keyword => self.parse_keyword(&token),
            TokenKind::Instruction => self.parse_instruction(&token),
            TokenKind::NumType => {
                self.eat(None)?;
                match VALUE_TYPES.get(token.text.as_str()) {
                    Some(&encoding) => Ok(Statement::ValueType {
                        name: token.text,
                        encoding,
                    }),
                    None => self.unknown(&token),
                }
            }
            _ => {
                self.eat(None)?;
                self.unknown(&token)
            }
        }
    }

    /// A token that starts no statement: a no-op, or an error when strict.
    fn unknown(&self, token: &Token) -> Result<Statement, ParseError> {
        if self.strict {
            Err(ParseError::UnexpectedStatement {
                kind: token.kind.to_string(),
                text: token.text.clone(),
                offset: token.offset,
            })
        } else {
            Ok(Statement::Nop)
        }
    }

    fn parse_keyword(&mut self, token: &Token) -> Result<Statement, ParseError> {
        match token.text.as_str() {
            "module" => {
                self.eat(Some("module"))?;
                Ok(Statement::Module {
                    empty: self.cursor.is_eof(),
                })
            }
            "func" => {
                self.eat(Some("func"))?;
                Ok(Statement::Func)
            }
            "export" => {
                self.eat(Some("export"))?;
                let name = self.expect_literal("export name")?;
                Ok(Statement::Export { name })
            }
            "result" => {
                self.eat(Some("result"))?;
                let value_type = self.parse_expression()?.text();
                Ok(Statement::Result { value_type })
            }
            "param" => {
                self.eat(Some("param"))?;
                // `(param i32 i32)`: the count is implied by the run of types
                let count = self.cursor.count_while(TokenKind::NumType);
                let mut types = Vec::with_capacity(count);
                for _ in 0..count {
                    types.push(self.eat(None)?.text);
                }
                Ok(Statement::Param { types })
            }
            "call" => {
                self.eat(Some("call"))?;
                let target = match self.cursor.current() {
                    Some(t) if t.kind == TokenKind::Number => {
                        let (n, operand) = self.numeric_operand(token)?;
                        let index = match u32::try_from(n) {
                            Ok(index) => index,
                            Err(_) => self.recover(&operand, 0)?,
                        };
                        Callee::Index(index)
                    }
                    _ => Callee::Name(self.expect_literal("call target")?),
                };
                Ok(Statement::Call { target })
            }
            _ => {
                self.eat(None)?;
                self.unknown(token)
            }
        }
    }

    /// A string literal operand. When permissive, any token's text is accepted.
    fn expect_literal(&mut self, what: &str) -> Result<String, ParseError> {
        if self.strict {
            if let Some(current) = self.cursor.current() {
                if current.kind != TokenKind::Literal {
                    return Err(ParseError::expected(what, &current.text, current.offset));
                }
            }
        }
        Ok(self.parse_expression()?.text())
    }

    fn parse_instruction(&mut self, token: &Token) -> Result<Statement, ParseError> {
        let mnemonic = token.text.as_str();
        let Some(&opcode) = OPCODES.get(mnemonic) else {
            self.eat(None)?;
            return self.unknown(token);
        };
        self.eat(Some(mnemonic))?;

        match opcode {
            OP_LOCAL_GET => {
                let (n, operand) = self.numeric_operand(token)?;
                let index = match u32::try_from(n) {
                    Ok(index) => index,
                    Err(_) => self.recover(&operand, 0)?,
                };
                Ok(Statement::LocalGet { index })
            }
            OP_I32_CONST => {
                let (n, operand) = self.numeric_operand(token)?;
                // unsigned spellings up to 2^32-1 wrap into the signed range
                let value = match u32::try_from(n) {
                    Ok(bits) => bits as i32,
                    Err(_) => self.recover(&operand, 0)?,
                };
                Ok(Statement::I32Const { value })
            }
            _ => match BinaryOp::from_opcode(opcode) {
                Some(op) => Ok(Statement::Binary { op }),
                None => self.unknown(token),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wat::lexer::tokenize;

    fn parse_source(source: &str) -> Vec<Statement> {
        parse(tokenize(source)).unwrap()
    }

    fn parse_strict(source: &str) -> Result<Vec<Statement>, ParseError> {
        parse_with(tokenize(source), &Options::strict())
    }

    #[test]
    fn addition_module() {
        let statements = parse_source(
            r#"(module (func (export "addNumbers") (param i32 i32) (result i32)
                local.get 0 local.get 1 i32.add))"#,
        );
        assert_eq!(
            statements,
            vec![
                Statement::Module { empty: false },
                Statement::Func,
                Statement::Export {
                    name: "\"addNumbers\"".to_string()
                },
                Statement::Param {
                    types: vec!["i32".to_string(), "i32".to_string()]
                },
                Statement::Result {
                    value_type: "i32".to_string()
                },
                Statement::LocalGet { index: 0 },
                Statement::LocalGet { index: 1 },
                Statement::Binary { op: BinaryOp::Add },
            ]
        );
    }

    #[test]
    fn no_tokens_is_fatal() {
        assert_eq!(parse(Vec::new()), Err(ParseError::NoTokens));
        assert_eq!(parse(tokenize("  ( ) ")), Err(ParseError::NoTokens));
    }

    #[test]
    fn module_only_is_empty() {
        assert_eq!(parse_source("(module)"), vec![Statement::Module { empty: true }]);
    }

    #[test]
    fn param_counts_contiguous_types() {
        assert_eq!(
            parse_source("param i32 i64 f32 result f64"),
            vec![
                Statement::Param {
                    types: vec!["i32".into(), "i64".into(), "f32".into()]
                },
                Statement::Result {
                    value_type: "f64".into()
                },
            ]
        );
        assert_eq!(parse_source("param"), vec![Statement::Param { types: vec![] }]);
    }

    #[test]
    fn const_operand() {
        assert_eq!(
            parse_source("i32.const 10 i32.const 4294967295"),
            vec![Statement::I32Const { value: 10 }, Statement::I32Const { value: -1 }]
        );
    }

    #[test]
    fn oversized_numbers_read_as_zero() {
        assert_eq!(
            parse_source("local.get 99999999999999999999 i32.const 4294967296"),
            vec![Statement::LocalGet { index: 0 }, Statement::I32Const { value: 0 }]
        );
    }

    #[test]
    fn oversized_numbers_are_errors_when_strict() {
        assert!(matches!(
            parse_strict("local.get 99999999999999999999"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_strict("i32.const 4294967296"),
            Err(ParseError::InvalidNumber { offset: 10, .. })
        ));
    }

    #[test]
    fn missing_operand_reads_as_zero() {
        assert_eq!(
            parse_source("local.get i32.add"),
            vec![Statement::LocalGet { index: 0 }, Statement::Binary { op: BinaryOp::Add }]
        );
        assert!(matches!(
            parse_strict("local.get i32.add"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_strict("i32.const"),
            Err(ParseError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn arithmetic_dispatch() {
        assert_eq!(
            parse_source("i32.add i32.sub i32.mul i32.div"),
            vec![
                Statement::Binary { op: BinaryOp::Add },
                Statement::Binary { op: BinaryOp::Sub },
                Statement::Binary { op: BinaryOp::Mul },
                Statement::Binary { op: BinaryOp::DivS },
            ]
        );
    }

    #[test]
    fn call_targets() {
        assert_eq!(
            parse_source(r#"call "addNumbers" call 2"#),
            vec![
                Statement::Call {
                    target: Callee::Name("\"addNumbers\"".into())
                },
                Statement::Call {
                    target: Callee::Index(2)
                },
            ]
        );
    }

    #[test]
    fn stray_tokens_become_nops() {
        assert_eq!(
            parse_source(r#"module "stray" 42 func"#),
            vec![
                Statement::Module { empty: false },
                Statement::Nop,
                Statement::Nop,
                Statement::Func,
            ]
        );
    }

    #[test]
    fn stray_value_type() {
        assert_eq!(
            parse_source("i32"),
            vec![Statement::ValueType {
                name: "i32".into(),
                encoding: 0x7f
            }]
        );
    }

    #[test]
    fn stray_tokens_are_errors_when_strict() {
        assert_eq!(
            parse_strict(r#"module "stray""#),
            Err(ParseError::UnexpectedStatement {
                kind: "literal".into(),
                text: "\"stray\"".into(),
                offset: 7,
            })
        );
    }

    #[test]
    fn export_needs_literal_when_strict() {
        assert!(matches!(
            parse_strict("export func"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        // permissive: the following token is taken as the name
        assert_eq!(
            parse_source("export 7"),
            vec![Statement::Export { name: "7".into() }]
        );
    }

    #[test]
    fn result_without_operand_is_fatal() {
        assert_eq!(
            parse_source_err("result"),
            ParseError::UnexpectedEnd {
                expected: "a token".into()
            }
        );
    }

    fn parse_source_err(source: &str) -> ParseError {
        parse(tokenize(source)).unwrap_err()
    }

    #[test]
    fn eat_checks_expected_text() {
        let mut parser = Parser::new(tokenize("func"), &Options::default());
        assert_eq!(
            parser.eat(Some("module")),
            Err(ParseError::expected("module", "func", 0))
        );
        assert!(parser.eat(Some("func")).is_ok());
        assert!(matches!(parser.eat(None), Err(ParseError::UnexpectedEnd { .. })));
    }
}
