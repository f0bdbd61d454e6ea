//! Statement nodes produced by the parser.
//!
//! The parse result is a flat, ordered list of [`Statement`]s rather than a
//! tree. Which `param`, `result`, `export` and instruction statements belong
//! to which function is recovered from their position: everything up to the
//! next [`Statement::Func`] belongs to the most recent one.

use crate::encoding::{
    OP_CALL, OP_I32_ADD, OP_I32_CONST, OP_I32_DIV_S, OP_I32_MUL, OP_I32_SUB, OP_LOCAL_GET,
};
use serde::Serialize;
use std::fmt;

/// The operand attached to a statement, as read from a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Expression {
    /// A decimal integer.
    Number(i64),
    /// A quoted string, quotes included.
    Literal(String),
    /// A value type name such as `i32`.
    TypeName(String),
    /// Any other token, kept verbatim.
    Other(String),
}

impl Expression {
    /// The source text of the operand.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Expression::Number(n) => n.to_string(),
            Expression::Literal(s) | Expression::TypeName(s) | Expression::Other(s) => s.clone(),
        }
    }
}

/// Arithmetic instructions taking two i32 operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    DivS,
}

impl BinaryOp {
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            OP_I32_ADD => Some(BinaryOp::Add),
            OP_I32_SUB => Some(BinaryOp::Sub),
            OP_I32_MUL => Some(BinaryOp::Mul),
            OP_I32_DIV_S => Some(BinaryOp::DivS),
            _ => None,
        }
    }

    #[must_use]
    pub fn opcode(self) -> u8 {
        match self {
            BinaryOp::Add => OP_I32_ADD,
            BinaryOp::Sub => OP_I32_SUB,
            BinaryOp::Mul => OP_I32_MUL,
            BinaryOp::DivS => OP_I32_DIV_S,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "i32.add",
            BinaryOp::Sub => "i32.sub",
            BinaryOp::Mul => "i32.mul",
            BinaryOp::DivS => "i32.div_s",
        };
        f.write_str(name)
    }
}

/// The target of a `call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Callee {
    /// A function named by its export literal.
    Name(String),
    /// A function index given directly.
    Index(u32),
}

/// One statement of the flat parse result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Statement {
    /// `module`. `empty` is set when nothing follows it.
    Module { empty: bool },
    /// `func`, opening a new function.
    Func,
    /// `param t*`, every contiguous value type after the keyword.
    Param { types: Vec<String> },
    /// `result t`. The type name is resolved when the type section is built.
    Result { value_type: String },
    /// `export "name"`, name kept as written.
    Export { name: String },
    /// `local.get n`
    LocalGet { index: u32 },
    /// `i32.const n`
    I32Const { value: i32 },
    /// `call "name"` or `call n`
    Call { target: Callee },
    /// `i32.add`, `i32.sub`, `i32.mul`, `i32.div`
    Binary { op: BinaryOp },
    /// A value type outside a `param` or `result` clause.
    ValueType { name: String, encoding: u8 },
    /// Anything the grammar does not recognise.
    Nop,
}

impl Statement {
    /// The opcode this statement emits into a function body, if it is an instruction.
    #[must_use]
    pub fn opcode(&self) -> Option<u8> {
        match self {
            Statement::LocalGet { .. } => Some(OP_LOCAL_GET),
            Statement::I32Const { .. } => Some(OP_I32_CONST),
            Statement::Call { .. } => Some(OP_CALL),
            Statement::Binary { op } => Some(op.opcode()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_opcodes() {
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::DivS] {
            assert_eq!(BinaryOp::from_opcode(op.opcode()), Some(op));
        }
        assert_eq!(BinaryOp::from_opcode(0x6c), Some(BinaryOp::Mul));
        assert_eq!(BinaryOp::from_opcode(0x20), None);
        assert_eq!(BinaryOp::from_opcode(0x41), None);
        assert_eq!(BinaryOp::DivS.to_string(), "i32.div_s");
    }

    #[test]
    fn statement_opcodes() {
        assert_eq!(Statement::LocalGet { index: 0 }.opcode(), Some(0x20));
        assert_eq!(Statement::I32Const { value: 10 }.opcode(), Some(0x41));
        assert_eq!(Statement::Call { target: Callee::Index(0) }.opcode(), Some(0x10));
        assert_eq!(Statement::Binary { op: BinaryOp::Sub }.opcode(), Some(0x6b));
        assert_eq!(Statement::Func.opcode(), None);
        assert_eq!(Statement::Nop.opcode(), None);
    }

    #[test]
    fn expression_text() {
        assert_eq!(Expression::Number(42).text(), "42");
        assert_eq!(Expression::Literal("\"a\"".into()).text(), "\"a\"");
    }

    #[test]
    fn statements_serialise_with_kind_tag() {
        let json = serde_json::to_string(&Statement::LocalGet { index: 1 }).unwrap();
        assert_eq!(json, r#"{"kind":"localGet","index":1}"#);
        let json = serde_json::to_string(&Statement::Func).unwrap();
        assert_eq!(json, r#"{"kind":"func"}"#);
    }
}
