//! Emits a WebAssembly binary module from the parser's statement list.
//!
//! The emitter walks the statements once. Function-level statements
//! (`param`, `result`, `export`, instructions) attach to the most recent
//! `func`; a function is closed when the next one opens or the input ends.
//! Each closed function contributes one entry to the Type, Function and Code
//! sections, and every `export` contributes one Export entry.
//!
//! # Binary layout
//!
//! ```text
//! module   ::= magic version typesec funcsec exportsec codesec
//! typesec  ::= section_1(vec(0x60 vec(valtype) vec(valtype)))
//! funcsec  ::= section_3(vec(typeidx))
//! exportsec::= section_7(vec(name 0x00 funcidx))
//! codesec  ::= section_10(vec(size:u32 vec(locals) instr* 0x0b))
//! ```
//!
//! All four sections are always written, in this order, even when their
//! vectors are empty.
//!
//! # Example
//!
//! ```
//! use luna::{emitter, wat};
//!
//! let statements = wat::parse(wat::tokenize("(module)")).unwrap();
//! let bytes = emitter::emit(&statements).unwrap();
//! assert_eq!(&bytes[0..4], b"\0asm");
//! ```

use crate::encoding::{
    create_section, encode_unsigned_leb128, encode_vector, write_name, write_vector, write_vs32, write_vu32,
    DESC_FUNC, MAGIC, OP_END, SECTION_CODE, SECTION_EXPORT, SECTION_FUNCTION, SECTION_TYPE, TYPE_FUNC,
    VALUE_TYPES, VERSION,
};
use crate::options::{unquote, Options};
use crate::wat::ast::{Callee, Statement};
use std::collections::HashMap;
use thiserror::Error;

// ===========================================================================
// Error type
// ===========================================================================

/// Errors that can occur during emission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("unknown value type `{0}`")]
    UnknownValueType(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {function} declares more than one result")]
    MultipleResults { function: u32 },

    #[error("`{statement}` outside of a function")]
    OutsideFunction { statement: String },

    #[error("missing `module`")]
    MissingModule,

    #[error("more than one `module`")]
    DuplicateModule,
}

// ===========================================================================
// Public API
// ===========================================================================

/// Emits a module from `statements` permissively.
pub fn emit(statements: &[Statement]) -> Result<Vec<u8>, EmitError> {
    emit_with(statements, &Options::default())
}

/// Emits a module from `statements` under `options`.
pub fn emit_with(statements: &[Statement], options: &Options) -> Result<Vec<u8>, EmitError> {
    let mut emitter = Emitter::new(options, statements);
    for statement in statements {
        emitter.emit_statement(statement)?;
    }
    emitter.finish()
}

// ===========================================================================
// Symbols
// ===========================================================================

/// Function name to ordinal index, built in one pass before code generation.
///
/// A function's names are the export literals that follow its `func`,
/// compared without their quotes.
fn build_symbol_table(statements: &[Statement]) -> (HashMap<String, u32>, u32) {
    let mut symbols = HashMap::new();
    let mut count = 0u32;
    for statement in statements {
        match statement {
            Statement::Func => count += 1,
            Statement::Export { name } if count > 0 => {
                symbols.entry(unquote(name).to_string()).or_insert(count - 1);
            }
            _ => {}
        }
    }
    (symbols, count)
}

// ===========================================================================
// Emitter
// ===========================================================================

/// The function currently being assembled.
#[derive(Debug, Default)]
struct FunctionBuilder {
    index: u32,
    params: Vec<u8>,
    results: Vec<u8>,
    code: Vec<u8>,
}

struct Emitter<'a> {
    options: &'a Options,
    symbols: HashMap<String, u32>,
    function_count: u32,
    saw_module: bool,
    current: Option<FunctionBuilder>,
    next_index: u32,

    // One encoded entry per vector element, per section
    types: Vec<Vec<u8>>,
    function_indices: Vec<Vec<u8>>,
    exports: Vec<Vec<u8>>,
    bodies: Vec<Vec<u8>>,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a Options, statements: &[Statement]) -> Self {
        let (symbols, function_count) = build_symbol_table(statements);
        Self {
            options,
            symbols,
            function_count,
            saw_module: false,
            current: None,
            next_index: 0,
            types: Vec::new(),
            function_indices: Vec::new(),
            exports: Vec::new(),
            bodies: Vec::new(),
        }
    }

    fn strict(&self) -> bool {
        self.options.is_strict()
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<(), EmitError> {
        crate::codegen_log!("Emitting ", #statement);

        match statement {
            Statement::Module { .. } => {
                if self.saw_module && self.strict() {
                    return Err(EmitError::DuplicateModule);
                }
                self.saw_module = true;
            }
            Statement::Func => {
                self.close_function();
                self.current = Some(FunctionBuilder {
                    index: self.next_index,
                    ..FunctionBuilder::default()
                });
                self.next_index += 1;
            }
            Statement::Param { types } => {
                let encoded = types
                    .iter()
                    .map(|name| value_type(name.as_str()))
                    .collect::<Result<Vec<u8>, _>>()?;
                if let Some(function) = self.function_for("param")? {
                    function.params.extend(encoded);
                }
            }
            Statement::Result { value_type: name } => {
                let encoded = value_type(name)?;
                let strict = self.strict();
                if let Some(function) = self.function_for("result")? {
                    if strict && !function.results.is_empty() {
                        return Err(EmitError::MultipleResults {
                            function: function.index,
                        });
                    }
                    function.results.push(encoded);
                }
            }
            Statement::Export { name } => {
                let name = self.options.literal_name(name).to_string();
                let index = match self.function_for("export")? {
                    Some(function) => function.index,
                    None => return Ok(()),
                };
                let mut entry = Vec::new();
                write_name(&mut entry, &name);
                entry.push(DESC_FUNC);
                write_vu32(&mut entry, index);
                self.exports.push(entry);
            }
            Statement::LocalGet { index } => {
                self.emit_instruction(statement, |code| write_vu32(code, *index))?;
            }
            Statement::I32Const { value } => {
                self.emit_instruction(statement, |code| write_vs32(code, *value))?;
            }
            Statement::Call { target } => {
                let index = self.resolve_call(target)?;
                self.emit_instruction(statement, |code| write_vu32(code, index))?;
            }
            Statement::Binary { .. } => {
                self.emit_instruction(statement, |_| {})?;
            }
            Statement::ValueType { .. } | Statement::Nop => {}
        }
        Ok(())
    }

    /// The open function, or `None` (an error when strict) outside of one.
    fn function_for(&mut self, statement: &str) -> Result<Option<&mut FunctionBuilder>, EmitError> {
        if self.current.is_none() && self.options.is_strict() {
            return Err(EmitError::OutsideFunction {
                statement: statement.to_string(),
            });
        }
        Ok(self.current.as_mut())
    }

    /// Appends the statement's opcode and whatever `operand` writes to the open body.
    fn emit_instruction(
        &mut self,
        statement: &Statement,
        operand: impl FnOnce(&mut Vec<u8>),
    ) -> Result<(), EmitError> {
        let Some(opcode) = statement.opcode() else {
            return Ok(());
        };
        if self.current.is_none() && self.strict() {
            return Err(EmitError::OutsideFunction {
                statement: format!("{:?}", statement),
            });
        }
        if let Some(function) = self.current.as_mut() {
            function.code.push(opcode);
            operand(&mut function.code);
        }
        Ok(())
    }

    fn resolve_call(&self, target: &Callee) -> Result<u32, EmitError> {
        match target {
            Callee::Name(name) => match self.symbols.get(unquote(name)) {
                Some(&index) => Ok(index),
                None if self.strict() => Err(EmitError::UnknownFunction(name.clone())),
                None => Ok(0),
            },
            Callee::Index(index) => {
                if self.strict() && *index >= self.function_count {
                    return Err(EmitError::UnknownFunction(index.to_string()));
                }
                Ok(*index)
            }
        }
    }

    /// Finalises the open function into one entry of each of the Type,
    /// Function and Code sections.
    fn close_function(&mut self) {
        let Some(function) = self.current.take() else {
            return;
        };

        let mut func_type = vec![TYPE_FUNC];
        write_vector(&mut func_type, function.params.len(), &function.params);
        write_vector(&mut func_type, function.results.len(), &function.results);
        self.types.push(func_type);

        // Each function gets its own signature, so type index == function index
        self.function_indices
            .push(encode_unsigned_leb128(function.index as u64));

        // No locals beyond the parameters
        let mut body = vec![0x00];
        body.extend_from_slice(&function.code);
        body.push(OP_END);

        let mut entry = Vec::with_capacity(body.len() + 1);
        write_vector(&mut entry, body.len(), &body);
        crate::codegen_log!("Closed function ", function.index, " body: ", #entry);
        self.bodies.push(entry);
    }

    fn finish(mut self) -> Result<Vec<u8>, EmitError> {
        self.close_function();
        if !self.saw_module && self.strict() {
            return Err(EmitError::MissingModule);
        }

        let mut module = Vec::new();
        module.extend_from_slice(&MAGIC);
        module.extend_from_slice(&VERSION);
        module.extend(create_section(SECTION_TYPE, &encode_vector(&self.types)));
        module.extend(create_section(SECTION_FUNCTION, &encode_vector(&self.function_indices)));
        module.extend(create_section(SECTION_EXPORT, &encode_vector(&self.exports)));
        module.extend(create_section(SECTION_CODE, &encode_vector(&self.bodies)));
        Ok(module)
    }
}

/// One-byte encoding of a value type name. Unknown names are always fatal.
fn value_type(name: &str) -> Result<u8, EmitError> {
    VALUE_TYPES
        .get(name)
        .copied()
        .ok_or_else(|| EmitError::UnknownValueType(name.to_string()))
}
