//! Module instances and the body interpreter.

use super::reader::{read_module, Instruction, ModuleAst};
use super::stack::Stack;
use super::RuntimeError;
use crate::options::unquote;
use crate::wat::BinaryOp;

/// Nested `call`s allowed before execution is abandoned.
pub const MAX_CALL_DEPTH: usize = 1024;

/// A decoded module ready to have its exports invoked.
#[derive(Debug, Clone)]
pub struct Instance {
    module: ModuleAst,
}

impl Instance {
    /// Decode and validate `bytes`.
    pub fn new(bytes: &[u8]) -> Result<Self, RuntimeError> {
        Ok(Instance {
            module: read_module(bytes)?,
        })
    }

    pub fn module(&self) -> &ModuleAst {
        &self.module
    }

    /// Export names as stored in the module.
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.module.exports.iter().map(|e| e.name.as_str())
    }

    /// Call the export `name` with `args` and return its result.
    ///
    /// Surrounding quotes are ignored on both sides when matching the name,
    /// so `"add"` and `add` find the same export.
    pub fn invoke(&self, name: &str, args: &[i32]) -> Result<i32, RuntimeError> {
        let wanted = unquote(name);
        let export = self
            .module
            .exports
            .iter()
            .find(|e| unquote(&e.name) == wanted)
            .ok_or_else(|| RuntimeError::ExportNotFound(name.to_string()))?;

        let func_type = self.module.func_type(export.function)?;
        if func_type.params.len() != args.len() {
            return Err(RuntimeError::InvalidArgumentsNumber {
                expected: func_type.params.len(),
                actual: args.len(),
            });
        }

        self.execute(export.function, args.to_vec(), 0)?
            .ok_or_else(|| RuntimeError::NoResult(name.to_string()))
    }

    /// Run function `index` to its `end`, returning its result if its type declares one.
    fn execute(&self, index: u32, mut locals: Vec<i32>, depth: usize) -> Result<Option<i32>, RuntimeError> {
        if depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded);
        }

        let func_type = self.module.func_type(index)?;
        let body = self
            .module
            .code
            .get(index as usize)
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(index))?;
        locals.resize(locals.len() + body.locals as usize, 0);

        let mut stack = Stack::new();
        for instruction in &body.instructions {
            match *instruction {
                Instruction::LocalGet(i) => {
                    let value = locals
                        .get(i as usize)
                        .copied()
                        .ok_or(RuntimeError::LocalIndexOutOfBounds(i))?;
                    stack.push(value);
                }
                Instruction::I32Const(value) => stack.push(value),
                Instruction::Call(callee) => {
                    let arity = self.module.func_type(callee)?.params.len();
                    let args = stack.pop_n(arity)?;
                    if let Some(result) = self.execute(callee, args, depth + 1)? {
                        stack.push(result);
                    }
                }
                Instruction::Binary(op) => {
                    let rhs = stack.pop()?;
                    let lhs = stack.pop()?;
                    stack.push(binary(op, lhs, rhs)?);
                }
                Instruction::End => break,
            }
        }

        if func_type.results.is_empty() {
            Ok(None)
        } else {
            stack.pop().map(Some)
        }
    }
}

/// i32 arithmetic with wasm semantics: wrapping, trapping on division by zero and overflow.
fn binary(op: BinaryOp, lhs: i32, rhs: i32) -> Result<i32, RuntimeError> {
    match op {
        BinaryOp::Add => Ok(lhs.wrapping_add(rhs)),
        BinaryOp::Sub => Ok(lhs.wrapping_sub(rhs)),
        BinaryOp::Mul => Ok(lhs.wrapping_mul(rhs)),
        BinaryOp::DivS => {
            if rhs == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            lhs.checked_div(rhs).ok_or(RuntimeError::IntegerOverflow)
        }
    }
}
