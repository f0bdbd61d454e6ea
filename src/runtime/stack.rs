//! Operand stack for the interpreter

use super::RuntimeError;

/// The i32 operand stack
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<i32>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: i32) {
        self.values.push(value);
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> Result<i32, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop the top `n` values, returned in the order they were pushed
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<i32>, RuntimeError> {
        if n > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.values.split_off(self.values.len() - n))
    }
}
