//! Module runtime
//!
//! Reads back the binary modules the compiler emits and interprets their
//! exported functions on an i32 operand stack.

pub mod instance;
pub mod reader;
pub mod stack;

pub use instance::Instance;
pub use reader::{read_module, ModuleAst};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Module is empty")]
    ModuleIsEmpty,
    #[error("Module is too short")]
    ModuleTooShort,
    #[error("Invalid magic header")]
    InvalidMagicHeader,
    #[error("Invalid version header")]
    InvalidVersionHeader,
    #[error("Invalid section: expected {expected:?}, found {found}")]
    InvalidSection { expected: Option<u8>, found: u8 },
    #[error("Section {id} size does not match its contents")]
    SectionSizeMismatch { id: u8 },
    #[error("Unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("Integer out of range at offset {offset}")]
    InvalidInteger { offset: usize },
    #[error("Invalid value type: {0:#04x}")]
    InvalidValueType(u8),
    #[error("Invalid export type: {0:#04x}")]
    InvalidExportType(u8),
    #[error("Invalid export name")]
    InvalidExportName,
    #[error("Invalid instruction: {0:#04x}")]
    InvalidInstruction(u8),
    #[error("Function declares more than {0} locals")]
    TooManyLocals(u32),
    #[error("{functions} functions declared but {bodies} bodies present")]
    FunctionCountMismatch { functions: usize, bodies: usize },
    #[error("Function index out of bounds: {0}")]
    FunctionIndexOutOfBounds(u32),
    #[error("Local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("Invalid number of arguments: expected {expected}, got {actual}")]
    InvalidArgumentsNumber { expected: usize, actual: usize },
    #[error("Export not found: {0}")]
    ExportNotFound(String),
    #[error("Function {0} returns no value")]
    NoResult(String),
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow")]
    IntegerOverflow,
    #[error("Call stack exhausted")]
    CallDepthExceeded,
}
